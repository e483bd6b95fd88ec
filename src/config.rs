// Copyright 2026 The Config DAG Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single process-wide configuration value, built once at construction time
//! and threaded through service constructors (spec.md §9's "global process
//! state" design note) — no hidden globals or lazily-initialized statics
//! for anything that varies by deployment.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Process-local (tier 1) cache capacity for context handles
    /// (`ContextService`'s reference-lookup cache — spec.md §4.6).
    pub context_cache_capacity: usize,
    /// TTL applied when a dirty context is written to the shared cache tier.
    pub context_cache_ttl: Duration,
    /// Upper bound on how far `NodeStore::walk` will traverse before giving
    /// up (spec.md §4.4 step 2c), used whenever a caller doesn't supply its
    /// own `depth_cap`.
    pub walk_depth_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_cache_capacity: 256,
            context_cache_ttl: Duration::from_secs(60 * 60),
            walk_depth_cap: 10_000,
        }
    }
}

impl EngineConfig {
    /// Reads overrides from the environment, falling back to defaults —
    /// the one place this crate looks at `std::env`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(cap) = std::env::var("CONFIG_DAG_WALK_DEPTH_CAP") {
            if let Ok(parsed) = cap.parse() {
                config.walk_depth_cap = parsed;
            }
        }
        config
    }
}

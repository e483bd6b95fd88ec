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

//! Two-tier cache fronting references and contexts (spec.md §4.5).
//!
//! Tier 1 is a bounded process-local `CLruCache`, the same crate and the
//! same wrapping pattern `jj-lib`'s `Store` uses for its commit/tree caches
//! (`examples/yuja-jj/lib/src/store.rs`). Tier 2 is the shared collaborator
//! from spec.md §6 — we only ship an in-memory stand-in for it here; a real
//! deployment points `SharedCache` at Redis/memcached or similar.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clru::CLruCache;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

/// Key/value API with TTL (spec.md §6). `put`/`get` are best-effort: errors
/// are logged and must never fail the caller (spec.md §4.5, §7).
#[async_trait]
pub trait SharedCache: Send + Sync + std::fmt::Debug {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SharedCacheError>;
    async fn put_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), SharedCacheError>;
}

#[derive(Debug, thiserror::Error)]
#[error("shared cache error: {0}")]
pub struct SharedCacheError(pub String);

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: std::time::Instant,
}

/// Reference `SharedCache` implementation: in-process, but honors TTL the
/// same way a real Redis-backed store would (lazily expired on read).
#[derive(Debug, Default)]
pub struct InMemorySharedCache {
    entries: Mutex<std::collections::HashMap<String, Entry>>,
}

impl InMemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedCache for InMemorySharedCache {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SharedCacheError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > std::time::Instant::now() => {
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), SharedCacheError> {
        self.entries.lock().insert(
            key.to_owned(),
            Entry {
                value,
                expires_at: std::time::Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Builds the ASCII, namespaced key shape from spec.md §6:
/// `appsub:{kind}:scope={scope}:account_id={acc}:user_id={user_or_empty}:{extra}`.
pub fn cache_key(kind: &str, repo: &crate::model::RepoKey, extra: &str) -> String {
    format!(
        "appsub:{kind}:scope={:?}:account_id={}:user_id={}:{extra}",
        repo.scope,
        repo.account_id,
        repo.user_id.as_deref().unwrap_or(""),
    )
    .to_lowercase()
}

/// Two-tier cache for one value type. `get`/`put` never surface tier-2
/// failures to the caller; they're logged at `warn!` and treated as a miss
/// (spec.md §4.5).
pub struct CacheService<V> {
    tier1: Mutex<CLruCache<String, V>>,
    tier2: Arc<dyn SharedCache>,
}

impl<V> std::fmt::Debug for CacheService<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService").finish_non_exhaustive()
    }
}

impl<V> CacheService<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(tier1_capacity: usize, tier2: Arc<dyn SharedCache>) -> Self {
        Self {
            tier1: Mutex::new(CLruCache::new(
                NonZeroUsize::new(tier1_capacity.max(1)).unwrap(),
            )),
            tier2,
        }
    }

    /// `get(query) -> (value?, hit)` from spec.md §4.5: consult tier 1, then
    /// tier 2 (repopulating tier 1 on a tier-2 hit), else miss.
    pub async fn get(&self, key: &str) -> (Option<V>, bool) {
        if let Some(value) = self.tier1.lock().get(key).cloned() {
            return (Some(value), true);
        }
        match self.tier2.get_bytes(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<V>(&bytes) {
                Ok(value) => {
                    self.tier1.lock().put(key.to_owned(), value.clone());
                    (Some(value), true)
                }
                Err(err) => {
                    tracing::warn!(%key, error = %err, "cache tier-2 value failed to deserialize");
                    (None, false)
                }
            },
            Ok(None) => (None, false),
            Err(err) => {
                tracing::warn!(%key, error = %err, "cache tier-2 read failed, falling through to store");
                (None, false)
            }
        }
    }

    pub async fn put(&self, key: &str, value: V, ttl: Duration) {
        self.tier1.lock().put(key.to_owned(), value.clone());
        match serde_json::to_vec(&value) {
            Ok(bytes) => {
                if let Err(err) = self.tier2.put_bytes(key, bytes, ttl).await {
                    tracing::warn!(%key, error = %err, "cache tier-2 write failed");
                }
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "cache value failed to serialize for tier-2");
            }
        }
    }

    pub fn invalidate(&self, key: &str) {
        self.tier1.lock().pop(key);
    }
}

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

//! A versioned, scoped configuration engine modeled as a content-addressed
//! DAG of JSON records, in the spirit of Git objects and refs
//! (`examples/yuja-jj` is this crate's teacher). See `SPEC_FULL.md` for the
//! full module-by-module design and `DESIGN.md` for how each piece is
//! grounded in the example corpus.

pub mod cache;
pub mod codec;
pub mod config;
pub mod config_service;
pub mod context;
pub mod dag;
pub mod diff;
pub mod error;
pub mod hash;
pub mod model;
pub mod object_id;
pub mod store;

pub use config::EngineConfig;
pub use config_service::{ConfigService, ListEntry, RecordTarget};
pub use context::{ContextHandle, ContextService};
pub use dag::DagService;
pub use diff::{DiffChainEntry, DiffService, VersionChainParams};
pub use error::{ConfigError, ConfigResult};
pub use model::{
    Node, NodeKind, NodeMetadata, RecordContents, RecordKind, RecordMetadata, RecordPayload,
    RecordQuery, RepoKey, Scope, SetMode, VersionRef,
};
pub use object_id::{ObjectId, RecordId, VersionHash};
pub use store::memory::MemoryRecordStore;
pub use store::RecordStore;

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

//! The transactional record store collaborator (spec.md §4.3/§4.4/§6).
//!
//! This module only defines the trait seam — the engine is written against
//! `dyn RecordStore` the same way `jj-lib` is written against `dyn Backend`
//! (see `examples/yuja-jj/lib/src/backend.rs`). [`memory`] provides the one
//! concrete implementation this crate ships, playing the role
//! `SimpleBackend` plays for `jj-lib`: good enough to run and test the
//! engine, not a production SQL backend (that stays a collaborator, per
//! spec.md §1's out-of-scope list).

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ConfigResult;
use crate::model::{Node, NodeMetadata, RefMap, ReferenceKind, RepoKey, VersionRef};
use crate::object_id::VersionHash;

/// One visited node plus whether the walk could still see its parent, so
/// callers can tell "reached the empty root" apart from "hit the depth cap"
/// apart from "reached `from_hash`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStop {
    ReachedFromHash,
    ReachedEmptyRoot,
    ReachedDepthCap,
}

#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// `ReferenceNotFound` when absent (spec.md §4.3).
    async fn get_ref(&self, repo: &RepoKey, kind: ReferenceKind) -> ConfigResult<VersionRef>;

    /// Idempotent: an upsert with a `VersionRef` carrying the same hash as
    /// the currently stored one is a no-op (spec.md §4.3, SPEC_FULL.md §3).
    async fn upsert_ref(
        &self,
        repo: &RepoKey,
        kind: ReferenceKind,
        version_ref: VersionRef,
    ) -> ConfigResult<()>;

    async fn get_node(&self, repo: &RepoKey, hash: &VersionHash) -> ConfigResult<Option<Node>>;

    /// Walks parent-wards from `to_hash` (defaults to the repo's head),
    /// newest-first, stopping at `from_hash` (inclusive), the empty root, or
    /// `depth_cap`, whichever comes first (spec.md §4.4 steps 1-2).
    async fn walk(
        &self,
        repo: &RepoKey,
        from_hash: Option<&VersionHash>,
        to_hash: Option<&VersionHash>,
        depth_cap: Option<usize>,
    ) -> ConfigResult<Vec<Node>>;

    /// On first touch, creates an `empty` node and binds `root` and `head`
    /// to it atomically; otherwise returns the existing bindings
    /// (spec.md §4.3).
    async fn get_or_init_repo(
        &self,
        repo: &RepoKey,
        now: DateTime<Utc>,
        created_by: &str,
    ) -> ConfigResult<RefMap>;

    /// Inserts `node` and advances `head` to it within a single
    /// transaction (spec.md §4.7, §5's "one transaction per top-level
    /// mutation"). `expected_head` is the parent the caller computed the
    /// node against; if the store's current head has since moved to a
    /// different hash, returns `ConfigObjectSettingConflict`. Replaying the
    /// exact same node (same hash, same content) against an unchanged head
    /// is a no-op that returns the existing node's metadata.
    async fn commit_node(
        &self,
        repo: &RepoKey,
        node: Node,
        expected_head: Option<&VersionHash>,
    ) -> ConfigResult<NodeMetadata>;
}

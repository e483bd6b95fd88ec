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

//! In-memory reference implementation of [`RecordStore`].
//!
//! Structurally this is `jj-lib`'s `SimpleBackend` (see
//! `examples/yuja-jj/lib/src/simple_backend.rs`) with the on-disk directories
//! swapped for `HashMap`s and the whole thing behind one `parking_lot::Mutex`
//! per store — in-memory stand-ins for the `nodes`/`refs` tables described in
//! spec.md §6, good enough to exercise the engine's invariants in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{ConfigError, ConfigResult};
use crate::hash::hash_node;
use crate::model::{
    Node, NodeKind, NodeMetadata, RefMap, ReferenceKind, RepoKey, VersionRef,
};
use crate::object_id::{ObjectId as _, VersionHash};

use super::RecordStore;

#[derive(Debug, Default)]
struct RepoData {
    nodes: HashMap<VersionHash, Node>,
    refs: HashMap<ReferenceKind, VersionRef>,
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    repos: Mutex<HashMap<RepoKey, RepoData>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(repo: &RepoKey, kind: ReferenceKind) -> ConfigError {
        ConfigError::ReferenceNotFound {
            scope: repo.scope,
            account_id: repo.account_id.clone(),
            user_id: repo.user_id.clone(),
            kind,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_ref(&self, repo: &RepoKey, kind: ReferenceKind) -> ConfigResult<VersionRef> {
        let repos = self.repos.lock();
        repos
            .get(repo)
            .and_then(|data| data.refs.get(&kind))
            .cloned()
            .ok_or_else(|| Self::not_found(repo, kind))
    }

    async fn upsert_ref(
        &self,
        repo: &RepoKey,
        kind: ReferenceKind,
        version_ref: VersionRef,
    ) -> ConfigResult<()> {
        let mut repos = self.repos.lock();
        let data = repos.entry(repo.clone()).or_default();
        if let Some(existing) = data.refs.get(&kind) {
            if existing.hash == version_ref.hash {
                return Ok(()); // idempotent no-op, SPEC_FULL.md §3
            }
        }
        data.refs.insert(kind, version_ref);
        Ok(())
    }

    async fn get_node(&self, repo: &RepoKey, hash: &VersionHash) -> ConfigResult<Option<Node>> {
        let repos = self.repos.lock();
        Ok(repos.get(repo).and_then(|data| data.nodes.get(hash)).cloned())
    }

    async fn walk(
        &self,
        repo: &RepoKey,
        from_hash: Option<&VersionHash>,
        to_hash: Option<&VersionHash>,
        depth_cap: Option<usize>,
    ) -> ConfigResult<Vec<Node>> {
        let repos = self.repos.lock();
        let data = repos
            .get(repo)
            .ok_or_else(|| Self::not_found(repo, ReferenceKind::Head))?;

        let mut current = match to_hash {
            Some(h) => h.clone(),
            None => data
                .refs
                .get(&ReferenceKind::Head)
                .ok_or_else(|| Self::not_found(repo, ReferenceKind::Head))?
                .hash
                .clone(),
        };

        let mut chain = Vec::new();
        loop {
            let node = data.nodes.get(&current).ok_or_else(|| {
                ConfigError::StoreConsistency(format!("dangling reference to node {current}"))
            })?;
            chain.push(node.clone());

            if Some(&current) == from_hash {
                break;
            }
            let Some(parent_ref) = &node.metadata.parent_ref else {
                break;
            };
            if !data.nodes.contains_key(&parent_ref.hash) {
                return Err(ConfigError::StoreConsistency(format!(
                    "node {current} points at parent {} which is not stored",
                    parent_ref.hash
                )));
            }
            if let Some(cap) = depth_cap {
                if chain.len() >= cap {
                    break;
                }
            }
            current = parent_ref.hash.clone();
        }
        Ok(chain)
    }

    async fn get_or_init_repo(
        &self,
        repo: &RepoKey,
        now: DateTime<Utc>,
        created_by: &str,
    ) -> ConfigResult<RefMap> {
        let mut repos = self.repos.lock();
        let data = repos.entry(repo.clone()).or_default();
        if !data.refs.is_empty() {
            return Ok(data.refs.clone().into_iter().collect());
        }

        let version_ref = VersionRef {
            hash: VersionHash::empty(),
            scope: repo.scope,
            account_id: repo.account_id.clone(),
            user_id: repo.stored_user_id().map(str::to_owned),
            created_at: now,
            created_by: created_by.to_owned(),
            committed_at: Some(now),
            note: None,
        };
        let node = Node {
            metadata: NodeMetadata {
                node_kind: NodeKind::Empty,
                scope: repo.scope,
                account_id: repo.account_id.clone(),
                user_id: repo.stored_user_id().map(str::to_owned),
                created_at: now,
                created_by: created_by.to_owned(),
                committed_at: Some(now),
                version_ref: version_ref.clone(),
                parent_ref: None,
            },
            contents: None,
        };
        data.nodes.insert(version_ref.hash.clone(), node);
        data.refs.insert(ReferenceKind::Root, version_ref.clone());
        data.refs.insert(ReferenceKind::Head, version_ref);
        Ok(data.refs.clone().into_iter().collect())
    }

    async fn commit_node(
        &self,
        repo: &RepoKey,
        node: Node,
        expected_head: Option<&VersionHash>,
    ) -> ConfigResult<NodeMetadata> {
        node.check_kind_invariant()?;
        let computed_hash = hash_node(&node);
        if node.hash() != &computed_hash {
            return Err(ConfigError::StoreConsistency(format!(
                "node hash {} does not match its own content (expected {computed_hash})",
                node.hash()
            )));
        }

        let mut repos = self.repos.lock();
        let data = repos.entry(repo.clone()).or_default();

        if let Some(parent) = &node.metadata.parent_ref {
            if !data.nodes.contains_key(&parent.hash) {
                return Err(ConfigError::StoreConsistency(format!(
                    "parent {} is not stored",
                    parent.hash
                )));
            }
        }

        // Check for a prior commit of this exact node *before* the conflict
        // check: a verbatim replay must succeed even if the head has since
        // moved past it (spec.md §8 E6), so idempotency takes priority over
        // the optimistic-concurrency check below.
        match data.nodes.get(node.hash()) {
            Some(existing) if nodes_content_eq(existing, &node) => {
                return Ok(existing.metadata.clone());
            }
            Some(_) => {
                return Err(ConfigError::HashCollision {
                    hash: node.hash().hex(),
                });
            }
            None => {}
        }

        if let Some(expected) = expected_head {
            let current_head = data.refs.get(&ReferenceKind::Head);
            let current_hash = current_head.map(|r| &r.hash);
            if current_hash != Some(expected) {
                return Err(ConfigError::ConfigObjectSettingConflict {
                    expected_parent: expected.hex(),
                });
            }
        }

        let metadata = node.metadata.clone();
        data.nodes.insert(node.hash().clone(), node);
        data.refs.insert(ReferenceKind::Head, metadata.version_ref.clone());
        Ok(metadata)
    }
}

/// Two nodes are "the same content" for replay purposes if they'd hash the
/// same; re-hashing is cheap and avoids a hand-maintained field-by-field
/// comparison drifting out of sync with the struct.
fn nodes_content_eq(a: &Node, b: &Node) -> bool {
    hash_node(a) == hash_node(b)
}

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

//! Create/commit nodes; initialise repositories (spec.md §4.7).
//!
//! `create_node` mints an unsaved [`Node`] the same way `jj-lib`'s
//! `SimpleBackend::write_commit` builds a `Commit` before hashing it
//! (`examples/yuja-jj/lib/src/simple_backend.rs`); the one deliberate
//! departure is the empty/root node, whose hash is pinned to the reserved
//! sentinel rather than derived from `hash_node` — mirroring how
//! `SimpleBackend::load` hard-codes `root_commit_id` as all-zero bytes
//! instead of hashing the root commit's (empty) content.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{ConfigError, ConfigResult};
use crate::hash::hash_node;
use crate::model::{Node, NodeKind, NodeMetadata, RecordPayload, RefMap, RepoKey, VersionRef};
use crate::object_id::VersionHash;
use crate::store::RecordStore;

pub struct DagService {
    store: Arc<dyn RecordStore>,
}

impl DagService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Builds a new node, without persisting it. `prev` is the node this one
    /// descends from (its `version_ref` becomes `parent_ref`); absent only
    /// for the repository's empty root.
    pub fn create_node(
        &self,
        repo: &RepoKey,
        kind: NodeKind,
        data: Option<RecordPayload>,
        prev: Option<&Node>,
        created_by: &str,
    ) -> ConfigResult<Node> {
        match kind {
            NodeKind::Empty => {
                if data.is_some() || prev.is_some() {
                    return Err(ConfigError::StoreConsistency(
                        "an empty node may not carry data or a parent".into(),
                    ));
                }
            }
            NodeKind::Record => {
                if data.is_none() {
                    return Err(ConfigError::MissingRequiredParameter("data"));
                }
            }
        }

        let now = Utc::now();
        let parent_ref = prev.map(|p| p.metadata.version_ref.clone());

        let mut version_ref = VersionRef {
            hash: VersionHash::empty(),
            scope: repo.scope,
            account_id: repo.account_id.clone(),
            user_id: repo.stored_user_id().map(str::to_owned),
            created_at: now,
            created_by: created_by.to_owned(),
            committed_at: None,
            note: None,
        };

        let mut node = Node {
            metadata: NodeMetadata {
                node_kind: kind,
                scope: repo.scope,
                account_id: repo.account_id.clone(),
                user_id: repo.stored_user_id().map(str::to_owned),
                created_at: now,
                created_by: created_by.to_owned(),
                committed_at: None,
                version_ref: version_ref.clone(),
                parent_ref,
            },
            contents: data,
        };

        if kind != NodeKind::Empty {
            let hash = hash_node(&node);
            version_ref.hash = hash.clone();
            node.metadata.version_ref.hash = hash;
        }

        Ok(node)
    }

    /// Persists `node` and advances `head` within a single transaction
    /// (spec.md §4.7). `expected_head` should be the hash of `prev` passed
    /// to `create_node`, used for the optimistic-concurrency check.
    pub async fn commit_node(
        &self,
        repo: &RepoKey,
        mut node: Node,
        expected_head: Option<&VersionHash>,
    ) -> ConfigResult<NodeMetadata> {
        node.check_kind_invariant()?;
        node.metadata.committed_at = Some(Utc::now());
        node.metadata.version_ref.committed_at = node.metadata.committed_at;
        self.store.commit_node(repo, node, expected_head).await
    }

    /// Thin call into the store's atomic repo initializer (spec.md §4.7).
    pub async fn get_references(&self, repo: &RepoKey) -> ConfigResult<RefMap> {
        repo.validate()?;
        self.store
            .get_or_init_repo(repo, Utc::now(), "system")
            .await
    }
}

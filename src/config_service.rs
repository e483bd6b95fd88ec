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

//! Orchestration facade: list, get-latest, set-values, insert-record
//! (spec.md §4.9). Wires ContextService, DagService and DiffService
//! together the way spec.md §2's flow diagram describes: a mutation goes
//! through DagService then advances the context's cached head; a read goes
//! through DiffService and reads NodeStore/RefStore.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::codec;
use crate::config::EngineConfig;
use crate::context::ContextService;
use crate::dag::DagService;
use crate::diff::{DiffChainEntry, DiffService, VersionChainParams};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    NodeKind, NodeMetadata, RecordContents, RecordKind, RecordMetadata, RecordQuery, RepoKey,
    SetMode,
};
use crate::object_id::RecordId;
use crate::store::RecordStore;

/// What the caller supplies to identify the record being written; `record_id`
/// is resolved (reused or minted) by `set_record_values` itself.
#[derive(Debug, Clone, Default)]
pub struct RecordTarget {
    pub record_id: Option<RecordId>,
    pub collection_key: String,
    pub item_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListEntry {
    pub record_key: String,
    pub record_metadata: RecordMetadata,
    pub node_metadata: NodeMetadata,
    pub record_contents: RecordContents,
    pub record_history: Vec<DiffChainEntry>,
}

pub struct ConfigService {
    store: Arc<dyn RecordStore>,
    context: ContextService,
    dag: DagService,
    diff: DiffService,
}

impl ConfigService {
    pub fn new(store: Arc<dyn RecordStore>, context: ContextService, config: EngineConfig) -> Self {
        Self {
            dag: DagService::new(store.clone()),
            diff: DiffService::new(store.clone(), config),
            store,
            context,
        }
    }

    /// One entry per distinct logical record currently visible
    /// (spec.md §4.9).
    pub async fn list_configs(
        &self,
        repo: &RepoKey,
        record_query: Option<RecordQuery>,
    ) -> ConfigResult<Vec<ListEntry>> {
        self.context.load(repo).await?;
        let entries = self
            .diff
            .version_chain(
                repo,
                VersionChainParams {
                    record_query,
                    include_record: true,
                    only_matching: true,
                    only_latest: true,
                    ..Default::default()
                },
            )
            .await?;

        Ok(entries
            .into_iter()
            .filter_map(|e| {
                let record_metadata = e.record_metadata?;
                let record_contents = e.record_contents.unwrap_or_default();
                Some(ListEntry {
                    record_key: record_metadata.record_key(),
                    record_metadata,
                    node_metadata: e.node_metadata,
                    record_contents,
                    record_history: e.record_history,
                })
            })
            .collect())
    }

    pub async fn get_latest_record(
        &self,
        repo: &RepoKey,
        record_query: &RecordQuery,
    ) -> ConfigResult<Option<DiffChainEntry>> {
        self.context.load(repo).await?;
        self.diff.latest_record(repo, None, None, record_query).await
    }

    /// §4.9: parent lookup -> merge -> new node -> new head, with the
    /// idempotency and parent-chain invariants from spec.md §8.
    pub async fn set_record_values(
        &self,
        repo: &RepoKey,
        kind: RecordKind,
        target: RecordTarget,
        mode: SetMode,
        values: Option<RecordContents>,
        created_by: &str,
    ) -> ConfigResult<NodeMetadata> {
        let Some(values) = values else {
            return Err(ConfigError::MissingRequiredParameter("values"));
        };
        if target.collection_key.is_empty() {
            return Err(ConfigError::MissingRequiredParameter("collection_key"));
        }
        if kind.requires_item_key() && target.item_key.is_none() {
            return Err(ConfigError::MissingRequiredParameter("item_key"));
        }

        let handle = self.context.load(repo).await?;
        let head_ref = handle
            .head()
            .ok_or(ConfigError::MissingRequiredParameter("head"))?;
        let parent_node = self
            .store
            .get_node(repo, &head_ref.hash)
            .await?
            .ok_or_else(|| ConfigError::StoreConsistency("head points at a missing node".into()))?;

        let lookup_query = RecordQuery {
            record_id: target.record_id.clone(),
            collection_key: Some(target.collection_key.clone()),
            item_key: target.item_key.clone(),
            record_kind: None,
        };
        let existing = self.diff.latest_record(repo, None, None, &lookup_query).await?;

        let record_id = target
            .record_id
            .or_else(|| existing.as_ref().and_then(|e| e.record_metadata.as_ref()).map(|m| m.record_id.clone()))
            .unwrap_or_else(RecordId::new_random);

        let final_contents = match mode {
            SetMode::Replace => values,
            SetMode::DeepMerge => {
                // Absent existing value is treated as replace (spec.md §9b).
                let mut dest = existing
                    .as_ref()
                    .and_then(|e| e.record_contents.clone())
                    .unwrap_or_default();
                codec::merge(&mut dest, &values);
                dest
            }
        };

        let record_metadata = RecordMetadata {
            record_id,
            collection_key: target.collection_key,
            item_key: target.item_key,
            record_kind: kind,
        };
        let payload = crate::model::RecordPayload {
            record_metadata,
            record_contents: final_contents,
        };

        let node = self.dag.create_node(
            repo,
            NodeKind::Record,
            Some(payload),
            Some(&parent_node),
            created_by,
        )?;
        let metadata = self
            .dag
            .commit_node(repo, node, Some(&head_ref.hash))
            .await?;

        handle.set_current(metadata.version_ref.clone());
        self.context.save(&handle).await?;

        Ok(metadata)
    }

    /// Thin wrapper projecting `object` to a map (spec.md §4.9). Generalized
    /// per SPEC_FULL.md §3 to accept any record_kind, not just
    /// `config_schema`, so schema-association records go through the same
    /// path.
    pub async fn insert_record<T: serde::Serialize>(
        &self,
        repo: &RepoKey,
        kind: RecordKind,
        target: RecordTarget,
        object: &T,
        created_by: &str,
    ) -> ConfigResult<NodeMetadata> {
        let values = codec::to_map(object)?;
        self.set_record_values(repo, kind, target, SetMode::Replace, Some(values), created_by)
            .await
    }
}

/// `X-Content-Hash` from spec.md §6: SHA-256 of the concatenated version
/// hashes of a list result, so an HTTP layer can set the header without
/// re-deriving the algorithm (SPEC_FULL.md §3).
pub fn list_content_hash(entries: &[ListEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.node_metadata.version_ref.hash_hex().as_bytes());
    }
    hex::encode(hasher.finalize())
}

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

//! Walk version chains; compute per-step patches (spec.md §4.8).
//!
//! This is the hardest algorithm in the engine (per spec.md §4.4's own
//! framing). It layers on top of [`crate::store::RecordStore::walk`]:
//! the store gives back the raw, newest-first node chain with correct
//! parent/child linkage; this module tags each node against the caller's
//! match filter, computes RFC-6902-style patches between adjacent nodes
//! with `json_patch`, and — for matching record nodes — attaches the
//! subchain of that record's own prior versions with a human-readable
//! unified diff rendered through `similar` against a YAML projection
//! (`serde_yaml`), grounded in how `jj-lib`'s CLI renders commit diffs
//! (`examples/yuja-jj/cli/src/diff_util.rs`) without pulling in its
//! file-diffing machinery, which has no equivalent here.

use std::sync::Arc;

use json_patch::Patch;
use serde::Serialize;
use serde_json::Value;

use crate::codec;
use crate::config::EngineConfig;
use crate::error::ConfigResult;
use crate::model::{Node, NodeKind, NodeMetadata, RecordContents, RecordMetadata, RecordQuery, RepoKey};
use crate::object_id::VersionHash;
use crate::store::RecordStore;

#[derive(Debug, Clone, Serialize)]
pub struct DiffChainEntry {
    pub current_hash: VersionHash,
    pub parent_hash: Option<VersionHash>,
    pub node_kind: NodeKind,
    pub node_metadata: NodeMetadata,
    pub record_metadata: Option<RecordMetadata>,
    pub record_contents: Option<RecordContents>,
    pub record_history: Vec<DiffChainEntry>,
    pub record_match: bool,
    pub node_patch: Option<Patch>,
    pub record_metadata_patch: Option<Patch>,
    pub record_contents_patch: Option<Patch>,
    pub history_contents_patch: Option<Patch>,
    pub history_diff_yaml: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VersionChainParams {
    pub from_hash: Option<VersionHash>,
    pub to_hash: Option<VersionHash>,
    pub record_query: Option<RecordQuery>,
    pub include_node_patch: bool,
    pub include_record_metadata_patch: bool,
    pub include_record_contents_patch: bool,
    pub include_record: bool,
    pub only_matching: bool,
    pub only_latest: bool,
    pub depth_cap: Option<usize>,
}

pub struct DiffService {
    store: Arc<dyn RecordStore>,
    config: EngineConfig,
}

impl DiffService {
    pub fn new(store: Arc<dyn RecordStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub async fn version_chain(
        &self,
        repo: &RepoKey,
        params: VersionChainParams,
    ) -> ConfigResult<Vec<DiffChainEntry>> {
        let nodes = self
            .store
            .walk(
                repo,
                params.from_hash.as_ref(),
                params.to_hash.as_ref(),
                Some(params.depth_cap.unwrap_or(self.config.walk_depth_cap)),
            )
            .await?;

        let mut entries = build_entries(&nodes, params.record_query.as_ref());

        if params.include_node_patch || params.include_record_metadata_patch || params.include_record_contents_patch {
            annotate_adjacent_patches(&mut entries, &params);
        }

        if params.include_record {
            attach_record_histories(&mut entries);
        }

        let mut out = entries;
        if params.only_matching {
            out.retain(|e| e.record_match);
        }
        if params.only_latest {
            let mut seen = std::collections::HashSet::new();
            out.retain(|e| {
                let Some(meta) = &e.record_metadata else {
                    return true;
                };
                seen.insert(meta.record_id.clone())
            });
        }
        Ok(out)
    }

    /// Walks newest->oldest, returning the first matching entry, with its
    /// `record_history` populated (spec.md §4.8).
    pub async fn latest_record(
        &self,
        repo: &RepoKey,
        from_hash: Option<&VersionHash>,
        to_hash: Option<&VersionHash>,
        record_query: &RecordQuery,
    ) -> ConfigResult<Option<DiffChainEntry>> {
        let nodes = self
            .store
            .walk(repo, from_hash, to_hash, Some(self.config.walk_depth_cap))
            .await?;
        let mut entries = build_entries(&nodes, Some(record_query));
        attach_record_histories(&mut entries);
        Ok(entries.into_iter().find(|e| e.record_match))
    }
}

fn build_entries(nodes: &[Node], query: Option<&RecordQuery>) -> Vec<DiffChainEntry> {
    nodes
        .iter()
        .map(|node| {
            let (record_metadata, record_contents) = match &node.contents {
                Some(payload) => (
                    Some(payload.record_metadata.clone()),
                    Some(payload.record_contents.clone()),
                ),
                None => (None, None),
            };
            let record_match = match (&record_metadata, query) {
                (Some(meta), Some(q)) => q.matches(meta),
                (Some(_), None) => true,
                (None, _) => false,
            };
            DiffChainEntry {
                current_hash: node.hash().clone(),
                parent_hash: node.parent_hash().cloned(),
                node_kind: node.metadata.node_kind,
                node_metadata: node.metadata.clone(),
                record_metadata,
                record_contents,
                record_history: Vec::new(),
                record_match,
                node_patch: None,
                record_metadata_patch: None,
                record_contents_patch: None,
                history_contents_patch: None,
                history_diff_yaml: None,
            }
        })
        .collect()
}

/// Node-level value used for `node_patch`: the whole record payload, or an
/// empty object for a non-record node (so diffing against the empty root
/// reads as "added everything" rather than null-vs-object noise).
fn node_value(entry: &DiffChainEntry) -> Value {
    match (&entry.record_metadata, &entry.record_contents) {
        (Some(meta), Some(contents)) => {
            let mut map = codec::to_map(meta).unwrap_or_default();
            map.insert("record_contents".into(), Value::Object(contents.clone()));
            Value::Object(map)
        }
        _ => Value::Object(Default::default()),
    }
}

fn record_metadata_value(entry: &DiffChainEntry) -> Value {
    entry
        .record_metadata
        .as_ref()
        .and_then(|m| codec::to_map(m).ok())
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(Default::default()))
}

fn record_contents_value(entry: &DiffChainEntry) -> Value {
    entry
        .record_contents
        .clone()
        .map(Value::Object)
        .unwrap_or_else(|| Value::Object(Default::default()))
}

/// Computes patches between each adjacent pair in the *full, unfiltered*
/// walk result — not the post-`only_matching` output — so a record's patch
/// is always taken against its true DAG parent, per the redesign decision
/// recorded in DESIGN.md for spec.md §9(a)'s ambiguity.
fn annotate_adjacent_patches(entries: &mut [DiffChainEntry], params: &VersionChainParams) {
    for i in 0..entries.len().saturating_sub(1) {
        let newer_node = node_value(&entries[i]);
        let newer_meta = record_metadata_value(&entries[i]);
        let newer_contents = record_contents_value(&entries[i]);
        let older_node = node_value(&entries[i + 1]);
        let older_meta = record_metadata_value(&entries[i + 1]);
        let older_contents = record_contents_value(&entries[i + 1]);

        if params.include_node_patch {
            entries[i].node_patch = Some(json_patch::diff(&older_node, &newer_node));
        }
        if params.include_record_metadata_patch {
            entries[i].record_metadata_patch = Some(json_patch::diff(&older_meta, &newer_meta));
        }
        if params.include_record_contents_patch {
            entries[i].record_contents_patch = Some(json_patch::diff(&older_contents, &newer_contents));
        }
    }
}

/// Attaches each matching entry's `record_history`: the subchain of *older*
/// versions sharing the same `record_id`, with per-step patches filled in
/// by [`annotate_history`]. `entries` is newest-to-oldest, so "older than
/// entry `i`" means index `> i` in the full chain — not merely "not this
/// entry" — otherwise a non-latest version would pick up newer versions of
/// the same record, which `annotate_history` assumes never happens.
fn attach_record_histories(entries: &mut [DiffChainEntry]) {
    let snapshot = entries.to_owned();
    for (i, entry) in entries.iter_mut().enumerate() {
        if !entry.record_match {
            continue;
        }
        let Some(meta) = &entry.record_metadata else {
            continue;
        };
        let mut history: Vec<DiffChainEntry> = snapshot[i + 1..]
            .iter()
            .filter(|other| other.record_metadata.as_ref().is_some_and(|m| m.record_id == meta.record_id))
            .cloned()
            .collect();
        history.insert(0, entry.clone_without_history());
        annotate_history(&mut history);
        entry.record_history = history.split_off(1);
    }
}

impl DiffChainEntry {
    fn clone_without_history(&self) -> Self {
        let mut clone = self.clone();
        clone.record_history = Vec::new();
        clone
    }
}

/// `annotate_history` from spec.md §4.8: entries ordered newest->oldest;
/// for entry `i`, `starting_values` is `entries[i+1].record_contents` (or
/// empty when `i` is last). Fills in `history_contents_patch` and a
/// unified-diff rendering of both sides projected to YAML.
pub fn annotate_history(entries: &mut [DiffChainEntry]) {
    for i in 0..entries.len() {
        let newer_contents = record_contents_value(&entries[i]);
        let older_contents = entries
            .get(i + 1)
            .map(record_contents_value)
            .unwrap_or_else(|| Value::Object(Default::default()));

        entries[i].history_contents_patch = Some(json_patch::diff(&older_contents, &newer_contents));
        entries[i].history_diff_yaml = Some(unified_yaml_diff(&older_contents, &newer_contents));
    }
}

fn unified_yaml_diff(older: &Value, newer: &Value) -> String {
    let older_yaml = serde_yaml::to_string(older).unwrap_or_default();
    let newer_yaml = serde_yaml::to_string(newer).unwrap_or_default();
    similar::TextDiff::from_lines(&older_yaml, &newer_yaml)
        .unified_diff()
        .header("before", "after")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DagService;
    use crate::model::{NodeKind, RecordKind, RecordMetadata, RecordPayload, Scope};
    use crate::object_id::RecordId;
    use crate::store::memory::MemoryRecordStore;
    use serde_json::json;

    async fn setup() -> (Arc<MemoryRecordStore>, DagService, DiffService, RepoKey) {
        let store = Arc::new(MemoryRecordStore::new());
        let dag = DagService::new(store.clone());
        let diff = DiffService::new(store.clone(), crate::config::EngineConfig::default());
        let repo = RepoKey::new(Scope::Account, "acme", None);
        dag.get_references(&repo).await.unwrap();
        (store, dag, diff, repo)
    }

    fn payload(record_id: RecordId, contents: Value) -> RecordPayload {
        RecordPayload {
            record_metadata: RecordMetadata {
                record_id,
                collection_key: "site".into(),
                item_key: None,
                record_kind: RecordKind::Keyed,
            },
            record_contents: contents.as_object().unwrap().clone(),
        }
    }

    #[tokio::test]
    async fn version_chain_with_contents_patch_matches_e5() {
        let (store, dag, diff, repo) = setup().await;
        let root_hash = store
            .get_ref(&repo, crate::model::ReferenceKind::Root)
            .await
            .unwrap()
            .hash;
        let root_node = store.get_node(&repo, &root_hash).await.unwrap().unwrap();

        let record_id = RecordId::new_random();
        let node1 = dag
            .create_node(
                &repo,
                NodeKind::Record,
                Some(payload(record_id.clone(), json!({"title": "Hello"}))),
                Some(&root_node),
                "tester",
            )
            .unwrap();
        let meta1 = dag.commit_node(&repo, node1.clone(), Some(&root_hash)).await.unwrap();

        let node2 = dag
            .create_node(
                &repo,
                NodeKind::Record,
                Some(payload(record_id, json!({"title": "Hello", "meta": {"tag": "v1"}}))),
                Some(&node1),
                "tester",
            )
            .unwrap();
        dag.commit_node(&repo, node2, Some(&meta1.version_ref.hash)).await.unwrap();

        let entries = diff
            .version_chain(
                &repo,
                VersionChainParams {
                    record_query: Some(RecordQuery::default()),
                    include_record_contents_patch: true,
                    only_matching: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(entries.len(), 2);
        let patch0 = entries[0].record_contents_patch.as_ref().unwrap();
        assert!(format!("{patch0:?}").contains("meta"));
        let patch1 = entries[1].record_contents_patch.as_ref().unwrap();
        assert!(format!("{patch1:?}").contains("title"));
    }

    /// A non-latest version of a record must only see *older* versions in
    /// its `record_history`, never newer ones — reachable through
    /// `include_record: true, only_matching: true, only_latest: false`,
    /// which `list_configs` never exercises (it always pairs `include_record`
    /// with `only_latest: true`).
    #[tokio::test]
    async fn record_history_excludes_newer_versions_of_the_same_record() {
        let (store, dag, diff, repo) = setup().await;
        let root_hash = store
            .get_ref(&repo, crate::model::ReferenceKind::Root)
            .await
            .unwrap()
            .hash;
        let root_node = store.get_node(&repo, &root_hash).await.unwrap().unwrap();

        let record_id = RecordId::new_random();
        let node1 = dag
            .create_node(
                &repo,
                NodeKind::Record,
                Some(payload(record_id.clone(), json!({"v": 1}))),
                Some(&root_node),
                "tester",
            )
            .unwrap();
        let meta1 = dag.commit_node(&repo, node1.clone(), Some(&root_hash)).await.unwrap();

        let node2 = dag
            .create_node(
                &repo,
                NodeKind::Record,
                Some(payload(record_id.clone(), json!({"v": 2}))),
                Some(&node1),
                "tester",
            )
            .unwrap();
        let meta2 = dag.commit_node(&repo, node2.clone(), Some(&meta1.version_ref.hash)).await.unwrap();

        let node3 = dag
            .create_node(
                &repo,
                NodeKind::Record,
                Some(payload(record_id, json!({"v": 3}))),
                Some(&node2),
                "tester",
            )
            .unwrap();
        dag.commit_node(&repo, node3, Some(&meta2.version_ref.hash)).await.unwrap();

        let entries = diff
            .version_chain(
                &repo,
                VersionChainParams {
                    record_query: Some(RecordQuery::default()),
                    include_record: true,
                    only_matching: true,
                    only_latest: false,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        // entries[0] is v3 (newest): history is [v2, v1].
        assert_eq!(entries[0].record_history.len(), 2);
        // entries[1] is v2: history must only contain v1, never v3.
        assert_eq!(entries[1].record_history.len(), 1);
        let v2_history_contents = entries[1].record_history[0]
            .record_contents
            .clone()
            .map(serde_json::Value::Object)
            .unwrap();
        assert_eq!(v2_history_contents, json!({"v": 1}));
        // entries[2] is v1 (oldest): no history left.
        assert!(entries[2].record_history.is_empty());
    }

    #[tokio::test]
    async fn adjacent_entries_satisfy_parent_child_linkage() {
        let (store, dag, diff, repo) = setup().await;
        let root_hash = store
            .get_ref(&repo, crate::model::ReferenceKind::Root)
            .await
            .unwrap()
            .hash;
        let root_node = store.get_node(&repo, &root_hash).await.unwrap().unwrap();
        let node1 = dag
            .create_node(
                &repo,
                NodeKind::Record,
                Some(payload(RecordId::new_random(), json!({"a": 1}))),
                Some(&root_node),
                "tester",
            )
            .unwrap();
        dag.commit_node(&repo, node1, Some(&root_hash)).await.unwrap();

        let entries = diff
            .version_chain(&repo, VersionChainParams::default())
            .await
            .unwrap();
        for pair in entries.windows(2) {
            assert_eq!(pair[0].parent_hash, Some(pair[1].current_hash.clone()));
        }
    }
}

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

//! Core data model: scopes, references, DAG nodes and record payloads.
//!
//! Shape follows spec.md §3 closely; the split between `NodeMetadata` (which
//! carries its own denormalized scope/account/user/timestamps) and the
//! embedded `VersionRef` (which denormalizes the same fields again, plus the
//! hash) is intentional — `VersionRef` is the identity record that gets
//! copied into `refs` rows, `NodeMetadata` is the full node envelope.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::object_id::{ObjectId as _, RecordId, VersionHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Account,
    User,
    #[default]
    Invalid,
}

/// Identifies a repository: a disjoint DAG and its references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoKey {
    pub scope: Scope,
    pub account_id: String,
    pub user_id: Option<String>,
}

impl RepoKey {
    pub fn new(scope: Scope, account_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            scope,
            account_id: account_id.into(),
            user_id,
        }
    }

    /// Validates the scope/user_id pairing invariant from spec.md §3:
    /// scope = user requires a non-empty user_id; otherwise user_id is
    /// ignored for record-matching (but we still reject a malformed one
    /// rather than silently drop it).
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.scope == Scope::User && self.user_id.as_deref().unwrap_or("").is_empty() {
            return Err(crate::error::ConfigError::MissingRequiredParameter("user_id"));
        }
        Ok(())
    }

    /// The user_id as stored: present only for user-scoped repos, mirroring
    /// the NOT NULL / NULL split enforced at the RefStore boundary (§4.3).
    pub fn stored_user_id(&self) -> Option<&str> {
        match self.scope {
            Scope::User => self.user_id.as_deref(),
            _ => None,
        }
    }
}

/// Content identity of a node: a version hash plus denormalized context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRef {
    pub hash: VersionHash,
    pub scope: Scope,
    pub account_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub committed_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl PartialEq for VersionRef {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
impl Eq for VersionRef {}

impl VersionRef {
    pub fn hash_hex(&self) -> String {
        self.hash.hex()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Empty,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Data,
    Keyed,
    Document,
    ConfigSchema,
    ConfigSchemaAssociation,
}

impl RecordKind {
    /// Document-like kinds require `item_key` (spec.md §3).
    pub fn requires_item_key(self) -> bool {
        matches!(self, Self::Document | Self::ConfigSchema | Self::ConfigSchemaAssociation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub record_id: RecordId,
    pub collection_key: String,
    pub item_key: Option<String>,
    pub record_kind: RecordKind,
}

impl RecordMetadata {
    /// `"{collection_key}/{item_key?}"`, per spec.md §4.9 `list_configs`.
    pub fn record_key(&self) -> String {
        match &self.item_key {
            Some(item) => format!("{}/{}", self.collection_key, item),
            None => self.collection_key.clone(),
        }
    }
}

pub type RecordContents = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    pub record_metadata: RecordMetadata,
    pub record_contents: RecordContents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub node_kind: NodeKind,
    pub scope: Scope,
    pub account_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub committed_at: Option<DateTime<Utc>>,
    pub version_ref: VersionRef,
    pub parent_ref: Option<VersionRef>,
}

/// Immutable once committed (spec.md §3: "A node is write-once").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub metadata: NodeMetadata,
    pub contents: Option<RecordPayload>,
}

impl Node {
    pub fn hash(&self) -> &VersionHash {
        &self.metadata.version_ref.hash
    }

    pub fn parent_hash(&self) -> Option<&VersionHash> {
        self.metadata.parent_ref.as_ref().map(|p| &p.hash)
    }

    /// Checks the structural invariant from spec.md §3:
    /// `node_kind = empty ⇔ (contents absent ∧ parent_ref absent)`.
    pub fn check_kind_invariant(&self) -> Result<(), crate::error::ConfigError> {
        match self.metadata.node_kind {
            NodeKind::Empty => {
                if self.contents.is_some() || self.metadata.parent_ref.is_some() {
                    return Err(crate::error::ConfigError::StoreConsistency(
                        "empty node must have no contents and no parent".into(),
                    ));
                }
            }
            NodeKind::Record => {
                if self.contents.is_none() {
                    return Err(crate::error::ConfigError::StoreConsistency(
                        "record node must have contents".into(),
                    ));
                }
                if self.metadata.parent_ref.is_none() {
                    return Err(crate::error::ConfigError::StoreConsistency(
                        "record node must have a parent_ref".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Root,
    Head,
    StageRoot,
    TaggedStage,
    Tag,
}

/// `(scope, account, user?, kind) -> VersionRef`. At most one binding per
/// key (spec.md §3). `stage_root`/`tagged_stage`/`tag` are carried in the
/// data model but unused by the walk, per the redesign flag in §9(c).
#[derive(Debug, Clone)]
pub struct Reference {
    pub repo: RepoKey,
    pub kind: ReferenceKind,
    pub version_ref: VersionRef,
}

pub type RefMap = BTreeMap<ReferenceKind, VersionRef>;

/// Filter applied during `NodeStore::walk` / `get` (spec.md §4.4).
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub record_id: Option<RecordId>,
    pub collection_key: Option<String>,
    pub item_key: Option<String>,
    pub record_kind: Option<RecordKind>,
}

impl RecordQuery {
    pub fn matches(&self, meta: &RecordMetadata) -> bool {
        if let Some(id) = &self.record_id {
            if *id != meta.record_id {
                return false;
            }
        }
        if let Some(ck) = &self.collection_key {
            if ck != &meta.collection_key {
                return false;
            }
        }
        if let Some(ik) = &self.item_key {
            if Some(ik) != meta.item_key.as_ref() {
                return false;
            }
        }
        if let Some(kind) = &self.record_kind {
            if *kind != meta.record_kind {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetMode {
    Replace,
    DeepMerge,
}

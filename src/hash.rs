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

//! Canonical JSON hashing of node payloads (spec.md §4.1).
//!
//! `serde_json::Map` is a `BTreeMap` in this crate (the `preserve_order`
//! feature is never enabled), so any `Value::Object` we build already
//! serializes with byte-lexicographic key order at every level; combined
//! with `serde_json`'s compact writer (no insignificant whitespace) and its
//! shortest round-trip float formatting, a plain `to_vec` already gives us
//! canonical JSON. The only thing `hash_node` does on top is zero the hash
//! field and the `committed_at` timestamps before serializing: a node's
//! identity is fixed when `create_node` builds it, before it has a commit
//! time, so `committed_at` (filled in later by `commit_node`) cannot be part
//! of what the hash covers.

use sha2::{Digest, Sha256};

use crate::model::Node;
use crate::object_id::VersionHash;

/// `SHA256(canonical_json(node with version_ref.hash and committed_at zeroed))`.
pub fn hash_node(node: &Node) -> VersionHash {
    let mut zeroed = node.clone();
    zeroed.metadata.version_ref.hash = VersionHash::empty();
    zeroed.metadata.version_ref.committed_at = None;
    zeroed.metadata.committed_at = None;
    let bytes = serde_json::to_vec(&zeroed).expect("Node serialization is infallible");
    let digest = Sha256::digest(&bytes);
    VersionHash::new(digest.to_vec())
}

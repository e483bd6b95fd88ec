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

//! Error taxonomy for the versioned config engine.
//!
//! Mirrors the shape of `jj-lib`'s `BackendError`/`OpStoreError`: one
//! `thiserror` enum with a fixed set of variants that callers can match on,
//! each wrapping a boxed source error when the cause comes from a
//! collaborator (store or cache) rather than from this crate's own checks.

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reference not found: scope={scope:?} account={account_id} user={user_id:?} kind={kind:?}")]
    ReferenceNotFound {
        scope: crate::model::Scope,
        account_id: String,
        user_id: Option<String>,
        kind: crate::model::ReferenceKind,
    },

    #[error("missing required parameter: {0}")]
    MissingRequiredParameter(&'static str),

    #[error("invalid config record type: {0}")]
    InvalidConfigRecordType(String),

    #[error("invalid config data object handle")]
    InvalidConfigDataObjectHandle,

    #[error("invalid config setting handle")]
    InvalidConfigSettingHandle,

    #[error("config setting handle already consumed")]
    ConfigSettingHandleConsumed,

    #[error("failed to encode config data object")]
    ConfigDataObjectEncodingFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("config object setting conflict: head changed while computing parent {expected_parent}")]
    ConfigObjectSettingConflict { expected_parent: String },

    #[error("invalid config diff params: {0}")]
    InvalidConfigDiffParams(String),

    #[error("hash collision on {hash}: store already holds a node with this hash but different content")]
    HashCollision { hash: String },

    #[error("node store consistency error: {0}")]
    StoreConsistency(String),

    #[error(transparent)]
    Store(Box<dyn std::error::Error + Send + Sync>),
}

impl ConfigError {
    pub fn store(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Store(err.into())
    }
}

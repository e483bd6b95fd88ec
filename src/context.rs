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

//! Mutable working state (account/user root, head) per scope (spec.md §4.6).
//!
//! `ContextHandle` is a sealed token: its payload is private to this module,
//! and callers only ever see it through the owning service's methods — the
//! same "no internal exposure" shape spec.md §9 asks for instead of a
//! runtime-type-asserted opaque handle. Mutation is guarded per-handle with
//! `std::sync::Mutex::try_lock`, giving single-writer semantics without
//! blocking a contended caller (spec.md §5).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheService, cache_key};
use crate::config::EngineConfig;
use crate::error::ConfigResult;
use crate::model::{ReferenceKind, RepoKey, VersionRef};
use crate::store::RecordStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedContext {
    account_root: Option<VersionRef>,
    user_root: Option<VersionRef>,
    head: Option<VersionRef>,
}

#[derive(Debug, Clone, Default)]
struct ContextState {
    account_root: Option<VersionRef>,
    user_root: Option<VersionRef>,
    head: Option<VersionRef>,
    /// Set whenever any slot changes and not yet reflected in the cache tier.
    dirty: bool,
    /// Set when a slot was synthesized locally (auto-created root/head on
    /// first touch) rather than loaded from the store or cache; cleared by
    /// `save`, same as `dirty`.
    skip_db: bool,
}

/// Opaque token bound to `(scope, account, user?)`. See module docs.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    repo: RepoKey,
    state: Arc<Mutex<ContextState>>,
}

impl ContextHandle {
    pub fn repo(&self) -> &RepoKey {
        &self.repo
    }

    pub fn head(&self) -> Option<VersionRef> {
        self.state.lock().unwrap().head.clone()
    }

    pub fn account_root(&self) -> Option<VersionRef> {
        self.state.lock().unwrap().account_root.clone()
    }

    pub fn user_root(&self) -> Option<VersionRef> {
        self.state.lock().unwrap().user_root.clone()
    }

    /// Non-blocking; returns whether the lock was acquired.
    pub fn set_current(&self, head: VersionRef) -> bool {
        let Ok(mut guard) = self.state.try_lock() else {
            return false;
        };
        guard.head = Some(head);
        guard.dirty = true;
        true
    }

    pub fn set_account_root(&self, root: VersionRef) -> bool {
        let Ok(mut guard) = self.state.try_lock() else {
            return false;
        };
        guard.account_root = Some(root);
        guard.dirty = true;
        true
    }

    pub fn set_user_root(&self, root: VersionRef) -> bool {
        let Ok(mut guard) = self.state.try_lock() else {
            return false;
        };
        guard.user_root = Some(root);
        guard.dirty = true;
        true
    }

    /// Stubbed default (spec.md §4.6): accepts the payload for downstream
    /// committing. The actual mutation — minting and committing a node — is
    /// DagService's job; this just confirms the handle is currently
    /// writable, the way a real implementation would stage the payload
    /// before handing it to DagService.
    pub fn set_data(&self, _cdo: &str, _data: &serde_json::Value) -> bool {
        self.state.try_lock().is_ok()
    }
}

pub struct ContextService {
    store: Arc<dyn RecordStore>,
    cache: CacheService<CachedContext>,
    handles: Mutex<HashMap<RepoKey, Arc<Mutex<ContextState>>>>,
    config: EngineConfig,
}

impl ContextService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        config: EngineConfig,
        tier2: Arc<dyn crate::cache::SharedCache>,
    ) -> Self {
        Self {
            store,
            cache: CacheService::new(config.context_cache_capacity, tier2),
            handles: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Populates the three reference slots from cache then storage,
    /// auto-creating an empty repo on first touch (spec.md §4.6).
    pub async fn load(&self, repo: &RepoKey) -> ConfigResult<ContextHandle> {
        repo.validate()?;

        if let Some(state) = self.handles.lock().unwrap().get(repo).cloned() {
            return Ok(ContextHandle { repo: repo.clone(), state });
        }

        let key = cache_key("context", repo, "state");
        let (cached, hit) = self.cache.get(&key).await;
        let state = if let Some(cached) = cached.filter(|_| hit) {
            ContextState {
                account_root: cached.account_root,
                user_root: cached.user_root,
                head: cached.head,
                dirty: false,
                skip_db: false,
            }
        } else {
            let now = Utc::now();
            let refs = self.store.get_or_init_repo(repo, now, "system").await?;
            let is_fresh_touch = refs
                .get(&ReferenceKind::Head)
                .is_some_and(|r| r.hash.is_empty());
            ContextState {
                account_root: (repo.scope != crate::model::Scope::User)
                    .then(|| refs.get(&ReferenceKind::Root).cloned())
                    .flatten(),
                user_root: (repo.scope == crate::model::Scope::User)
                    .then(|| refs.get(&ReferenceKind::Root).cloned())
                    .flatten(),
                head: refs.get(&ReferenceKind::Head).cloned(),
                dirty: is_fresh_touch,
                skip_db: is_fresh_touch,
            }
        };

        let state = Arc::new(Mutex::new(state));
        self.handles.lock().unwrap().insert(repo.clone(), state.clone());
        Ok(ContextHandle { repo: repo.clone(), state })
    }

    /// Writes the handle's current state into the cache tier with the
    /// configured TTL and clears the dirty/skip_db bits (spec.md §4.6). The durable
    /// store itself is already up to date by this point — references only
    /// move forward through `DagService::commit_node`, which upserts `head`
    /// transactionally — so `save` here is about keeping the cache in sync,
    /// not re-deriving a store write.
    pub async fn save(&self, handle: &ContextHandle) -> ConfigResult<()> {
        let cached = {
            let mut guard = handle.state.lock().unwrap();
            if !guard.dirty {
                return Ok(());
            }
            let cached = CachedContext {
                account_root: guard.account_root.clone(),
                user_root: guard.user_root.clone(),
                head: guard.head.clone(),
            };
            guard.dirty = false;
            guard.skip_db = false;
            cached
        };

        let key = cache_key("context", &handle.repo, "state");
        self.cache.put(&key, cached, self.config.context_cache_ttl).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemorySharedCache;
    use crate::model::Scope;
    use crate::object_id::ObjectId as _;
    use crate::store::memory::MemoryRecordStore;

    fn service() -> ContextService {
        let store = Arc::new(MemoryRecordStore::new());
        ContextService::new(store, crate::config::EngineConfig::default(), Arc::new(InMemorySharedCache::new()))
    }

    #[tokio::test]
    async fn first_touch_auto_creates_and_is_dirty() {
        let svc = service();
        let repo = RepoKey::new(Scope::Account, "acme", None);
        let handle = svc.load(&repo).await.unwrap();
        assert!(handle.head().is_some());
        assert_eq!(handle.head().unwrap().hash.hex(), crate::object_id::VersionHash::EMPTY_HEX);
        svc.save(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn repeated_load_returns_shared_handle() {
        let svc = service();
        let repo = RepoKey::new(Scope::Account, "acme", None);
        let a = svc.load(&repo).await.unwrap();
        let b = svc.load(&repo).await.unwrap();
        assert!(a.set_current(a.head().unwrap()));
        assert_eq!(a.head().unwrap().hash, b.head().unwrap().hash);
    }

    #[tokio::test]
    async fn user_scope_requires_user_id() {
        let svc = service();
        let repo = RepoKey::new(Scope::User, "acme", None);
        let err = svc.load(&repo).await.unwrap_err();
        assert!(matches!(err, crate::error::ConfigError::MissingRequiredParameter(_)));
    }
}

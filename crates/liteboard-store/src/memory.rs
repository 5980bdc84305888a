//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use liteboard_core::{
    ContentId, ContentIdSet, GrantId, GrantRecord, NewGrant, NewShareToken, ShareToken,
    ShareTokenId,
};

use crate::error::{Result, StoreError};
use crate::traits::{ApplyOutcome, GrantChange, GrantFilter, GrantStore, ShareTokenStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; a batch
/// holds the write lock for its whole validate-then-apply pass.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Grant rows by id. BTreeMap keeps query results ordered by id.
    grants: BTreeMap<GrantId, GrantRecord>,

    /// Share tokens by row id.
    tokens: BTreeMap<ShareTokenId, ShareToken>,

    next_grant_id: i64,
    next_token_id: i64,
}

impl MemoryStoreInner {
    fn insert_grant(&mut self, grant: &NewGrant) -> GrantId {
        self.next_grant_id += 1;
        let id = GrantId(self.next_grant_id);
        self.grants.insert(
            id,
            GrantRecord {
                id,
                user_id: grant.user_id,
                content_type: grant.content_type,
                action: grant.action,
                content_ids: grant.content_ids.clone(),
                version: 1,
            },
        );
        id
    }

    fn has_key(&self, grant: &NewGrant) -> bool {
        let key = grant.key();
        self.grants.values().any(|g| g.key() == key)
    }

    fn at_version(&self, id: GrantId, expected: u64) -> bool {
        self.grants.get(&id).is_some_and(|g| g.version == expected)
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Task(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Task(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn query_grants(&self, filter: &GrantFilter) -> Result<Vec<GrantRecord>> {
        let inner = self.read()?;
        Ok(inner
            .grants
            .values()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect())
    }

    async fn get_grant(&self, id: GrantId) -> Result<Option<GrantRecord>> {
        let inner = self.read()?;
        Ok(inner.grants.get(&id).cloned())
    }

    async fn insert_grant(&self, grant: &NewGrant) -> Result<GrantId> {
        let mut inner = self.write()?;
        Ok(inner.insert_grant(grant))
    }

    async fn update_content_ids(&self, id: GrantId, content_ids: &ContentIdSet) -> Result<()> {
        let mut inner = self.write()?;
        let grant = inner
            .grants
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("grant {}", id)))?;
        grant.content_ids = content_ids.clone();
        grant.version += 1;
        Ok(())
    }

    async fn delete_grant(&self, id: GrantId) -> Result<()> {
        let mut inner = self.write()?;
        inner.grants.remove(&id);
        Ok(())
    }

    async fn apply_grant_changes(&self, changes: &[GrantChange]) -> Result<ApplyOutcome> {
        let mut inner = self.write()?;

        // Validate every predicate before touching anything
        let valid = changes.iter().all(|change| match change {
            GrantChange::Insert(grant) => !inner.has_key(grant),
            GrantChange::Update {
                id,
                expected_version,
                ..
            }
            | GrantChange::Delete {
                id,
                expected_version,
            } => inner.at_version(*id, *expected_version),
        });
        if !valid {
            return Ok(ApplyOutcome::Conflict);
        }

        for change in changes {
            match change {
                GrantChange::Insert(grant) => {
                    inner.insert_grant(grant);
                }
                GrantChange::Update {
                    id, content_ids, ..
                } => {
                    if let Some(grant) = inner.grants.get_mut(id) {
                        grant.content_ids = content_ids.clone();
                        grant.version += 1;
                    }
                }
                GrantChange::Delete { id, .. } => {
                    inner.grants.remove(id);
                }
            }
        }

        Ok(ApplyOutcome::Applied)
    }
}

#[async_trait]
impl ShareTokenStore for MemoryStore {
    async fn insert_share_token(&self, token: &NewShareToken) -> Result<ShareTokenId> {
        let mut inner = self.write()?;
        if inner.tokens.values().any(|t| t.token == token.token) {
            return Err(StoreError::InvalidData("duplicate share token value".into()));
        }
        inner.next_token_id += 1;
        let id = ShareTokenId(inner.next_token_id);
        inner.tokens.insert(id, token.clone().into_stored(id));
        Ok(id)
    }

    async fn get_share_token(&self, token: &str) -> Result<Option<ShareToken>> {
        let inner = self.read()?;
        Ok(inner.tokens.values().find(|t| t.token == token).cloned())
    }

    async fn share_tokens_for_project(&self, project_id: ContentId) -> Result<Vec<ShareToken>> {
        let inner = self.read()?;
        Ok(inner
            .tokens
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete_share_token(&self, id: ShareTokenId) -> Result<bool> {
        let mut inner = self.write()?;
        Ok(inner.tokens.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liteboard_core::{Action, ContentType, GrantKey, ShareLevel, UserId};

    fn new_grant(user: i64, action: Action, ids: &[i64]) -> NewGrant {
        NewGrant::new(
            GrantKey::new(UserId(user), ContentType::Project, action),
            ids.iter().copied().map(ContentId).collect(),
        )
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let id = store
            .insert_grant(&new_grant(1, Action::Read, &[1, 2]))
            .await
            .unwrap();

        let grant = store.get_grant(id).await.unwrap().unwrap();
        assert_eq!(grant.version, 1);
        assert!(grant.covers(ContentId(2)));

        store
            .update_content_ids(id, &ContentIdSet::single(ContentId(9)))
            .await
            .unwrap();
        let grant = store.get_grant(id).await.unwrap().unwrap();
        assert_eq!(grant.version, 2);
        assert!(!grant.covers(ContentId(2)));
    }

    #[tokio::test]
    async fn test_memory_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let id = store
            .insert_grant(&new_grant(1, Action::Read, &[1]))
            .await
            .unwrap();

        // Second change has a stale version, so the insert must not land either
        let changes = vec![
            GrantChange::Insert(new_grant(1, Action::Write, &[1])),
            GrantChange::Delete {
                id,
                expected_version: 7,
            },
        ];
        let outcome = store.apply_grant_changes(&changes).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::Conflict);

        let all = store.query_grants(&GrantFilter::new()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_tokens() {
        let store = MemoryStore::new();
        let token = NewShareToken {
            token: "abc".into(),
            project_id: ContentId(5),
            permission_level: ShareLevel::Write,
            created_at: 10,
            expires_at: 20,
        };
        let id = store.insert_share_token(&token).await.unwrap();
        assert!(store.insert_share_token(&token).await.is_err());

        let found = store.get_share_token("abc").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(store.share_tokens_for_project(ContentId(5)).await.unwrap().len(), 1);

        assert!(store.delete_share_token(id).await.unwrap());
        assert!(!store.delete_share_token(id).await.unwrap());
        assert!(store.get_share_token("abc").await.unwrap().is_none());
    }
}

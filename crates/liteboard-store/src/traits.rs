//! Store traits: the abstract interface for grant and share-token persistence.
//!
//! These traits keep the engine storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use liteboard_core::{
    Action, ContentId, ContentIdSet, ContentType, GrantId, GrantKey, GrantRecord, NewGrant,
    NewShareToken, ShareToken, ShareTokenId, UserId,
};

use crate::error::Result;

/// Optional equality filters for [`GrantStore::query_grants`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantFilter {
    pub user_id: Option<UserId>,
    pub content_type: Option<ContentType>,
    pub action: Option<Action>,
}

impl GrantFilter {
    /// Match every grant row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match exactly one grant key.
    pub fn key(key: GrantKey) -> Self {
        Self {
            user_id: Some(key.user_id),
            content_type: Some(key.content_type),
            action: Some(key.action),
        }
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Whether a record passes every set filter.
    pub fn matches(&self, record: &GrantRecord) -> bool {
        self.user_id.map_or(true, |u| record.user_id == u)
            && self.content_type.map_or(true, |t| record.content_type == t)
            && self.action.map_or(true, |a| record.action == a)
    }
}

/// One step of an atomic grant batch.
///
/// Every variant carries a compare-and-swap predicate. If any predicate fails
/// the whole batch is rejected with [`ApplyOutcome::Conflict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantChange {
    /// Insert a new row. Fails if a row for the same key already exists.
    Insert(NewGrant),
    /// Replace a row's id set. Fails unless the row is still at `expected_version`.
    Update {
        id: GrantId,
        expected_version: u64,
        content_ids: ContentIdSet,
    },
    /// Delete a row. Fails unless the row is still at `expected_version`.
    Delete { id: GrantId, expected_version: u64 },
}

/// Result of [`GrantStore::apply_grant_changes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every change was applied.
    Applied,
    /// A predicate failed; nothing was applied.
    Conflict,
}

/// Async interface for grant persistence.
///
/// # Design Notes
///
/// - **No uniqueness enforcement**: `insert_grant` never checks for an existing
///   row with the same key. Only batched inserts carry that predicate.
/// - **Versions**: `update_content_ids` and batched updates bump `version`.
/// - **Errors**: any I/O failure surfaces as a [`crate::StoreError`], unchanged.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Rows matching the filter, ordered by id.
    async fn query_grants(&self, filter: &GrantFilter) -> Result<Vec<GrantRecord>>;

    /// Get one row by id.
    async fn get_grant(&self, id: GrantId) -> Result<Option<GrantRecord>>;

    /// Insert a row unconditionally.
    async fn insert_grant(&self, grant: &NewGrant) -> Result<GrantId>;

    /// Replace a row's id set unconditionally.
    ///
    /// Returns `NotFound` if the row no longer exists.
    async fn update_content_ids(&self, id: GrantId, content_ids: &ContentIdSet) -> Result<()>;

    /// Delete a row. Deleting a missing row is not an error.
    async fn delete_grant(&self, id: GrantId) -> Result<()>;

    /// Apply a batch atomically, all or nothing.
    async fn apply_grant_changes(&self, changes: &[GrantChange]) -> Result<ApplyOutcome>;
}

/// Async interface for share-token persistence.
#[async_trait]
pub trait ShareTokenStore: Send + Sync {
    /// Store a token and return its row id.
    async fn insert_share_token(&self, token: &NewShareToken) -> Result<ShareTokenId>;

    /// Look up a token by its bearer value.
    async fn get_share_token(&self, token: &str) -> Result<Option<ShareToken>>;

    /// Every token for a project, expired ones included, ordered by id.
    async fn share_tokens_for_project(&self, project_id: ContentId) -> Result<Vec<ShareToken>>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_share_token(&self, id: ShareTokenId) -> Result<bool>;
}

/// Extension trait for common grant lookups.
pub trait GrantStoreExt: GrantStore {
    /// All rows for a `(user, content_type)` pair, any action.
    fn grants_for(
        &self,
        user_id: UserId,
        content_type: ContentType,
    ) -> impl std::future::Future<Output = Result<Vec<GrantRecord>>> + Send;
}

impl<S: GrantStore + ?Sized> GrantStoreExt for S {
    async fn grants_for(
        &self,
        user_id: UserId,
        content_type: ContentType,
    ) -> Result<Vec<GrantRecord>> {
        let filter = GrantFilter::new().user(user_id).content_type(content_type);
        self.query_grants(&filter).await
    }
}

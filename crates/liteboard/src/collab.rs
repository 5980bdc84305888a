//! Collaborators the board consumes but does not own.
//!
//! Payload storage for projects, lists, and entries lives behind
//! [`ContentRepository`]; user profiles behind [`IdentityDirectory`]. The
//! in-memory implementations here back tests and embedded use.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;

use liteboard_core::{ContentId, ContentType, UserId, UserProfile};

/// Opaque CRUD over content payloads, keyed by `(content_type, id)`.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Persist a new item and return its id.
    async fn create(&self, content_type: ContentType, body: Value) -> anyhow::Result<ContentId>;

    async fn get(&self, content_type: ContentType, id: ContentId) -> anyhow::Result<Option<Value>>;

    /// Replace an item's body. Returns false if it does not exist.
    async fn update(
        &self,
        content_type: ContentType,
        id: ContentId,
        body: Value,
    ) -> anyhow::Result<bool>;

    /// Returns false if it does not exist.
    async fn delete(&self, content_type: ContentType, id: ContentId) -> anyhow::Result<bool>;
}

/// Resolves user ids to profile info.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn user_profile(&self, user_id: UserId) -> anyhow::Result<Option<UserProfile>>;
}

#[derive(Default)]
struct ContentTables {
    items: HashMap<(ContentType, ContentId), Value>,
    next_id: i64,
}

/// In-memory content repository. Ids are shared across content types.
#[derive(Default)]
pub struct MemoryContentRepository {
    inner: RwLock<ContentTables>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("content repository lock poisoned: {}", e)
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn create(&self, content_type: ContentType, body: Value) -> anyhow::Result<ContentId> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.next_id += 1;
        let id = ContentId(inner.next_id);
        inner.items.insert((content_type, id), body);
        Ok(id)
    }

    async fn get(&self, content_type: ContentType, id: ContentId) -> anyhow::Result<Option<Value>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.items.get(&(content_type, id)).cloned())
    }

    async fn update(
        &self,
        content_type: ContentType,
        id: ContentId,
        body: Value,
    ) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        match inner.items.get_mut(&(content_type, id)) {
            Some(slot) => {
                *slot = body;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, content_type: ContentType, id: ContentId) -> anyhow::Result<bool> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        Ok(inner.items.remove(&(content_type, id)).is_some())
    }
}

/// In-memory identity directory.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile.
    pub fn insert(&self, profile: UserProfile) -> anyhow::Result<()> {
        let mut users = self.users.write().map_err(poisoned)?;
        users.insert(profile.id, profile);
        Ok(())
    }
}

#[async_trait]
impl IdentityDirectory for MemoryDirectory {
    async fn user_profile(&self, user_id: UserId) -> anyhow::Result<Option<UserProfile>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_repository_crud() {
        let repo = MemoryContentRepository::new();
        let id = repo
            .create(ContentType::Project, json!({"name": "alpha"}))
            .await
            .unwrap();

        assert_eq!(
            repo.get(ContentType::Project, id).await.unwrap(),
            Some(json!({"name": "alpha"}))
        );
        // Same id, other type: a different item
        assert!(repo.get(ContentType::ContentList, id).await.unwrap().is_none());

        assert!(repo
            .update(ContentType::Project, id, json!({"name": "beta"}))
            .await
            .unwrap());
        assert!(repo.delete(ContentType::Project, id).await.unwrap());
        assert!(!repo.delete(ContentType::Project, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_directory() {
        let dir = MemoryDirectory::new();
        dir.insert(UserProfile {
            id: UserId(2),
            username: "bob".into(),
            email: "bob@example.com".into(),
        })
        .unwrap();

        let bob = dir.user_profile(UserId(2)).await.unwrap().unwrap();
        assert_eq!(bob.username, "bob");
        assert!(dir.user_profile(UserId(3)).await.unwrap().is_none());
    }
}

//! Grant records and the content id sets they carry.
//!
//! A grant authorizes one user to perform one action tier on a set of content
//! ids of one content type. For a given [`GrantKey`] at most one live record
//! should exist; that is maintained by the mutator, not by storage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::access::{Action, ContentType};
use crate::error::CoreError;
use crate::types::{ContentId, GrantId, UserId};

/// An ordered, duplicate-free set of content ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentIdSet(BTreeSet<ContentId>);

impl ContentIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(id: ContentId) -> Self {
        Self(BTreeSet::from([id]))
    }

    pub fn contains(&self, id: ContentId) -> bool {
        self.0.contains(&id)
    }

    /// Returns `true` if the id was not present.
    pub fn insert(&mut self, id: ContentId) -> bool {
        self.0.insert(id)
    }

    /// Returns `true` if the id was present.
    pub fn remove(&mut self, id: ContentId) -> bool {
        self.0.remove(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ContentId> + '_ {
        self.0.iter().copied()
    }

    /// A copy with `id` added.
    pub fn with(&self, id: ContentId) -> Self {
        let mut next = self.clone();
        next.insert(id);
        next
    }

    /// A copy with `id` removed.
    pub fn without(&self, id: ContentId) -> Self {
        let mut next = self.clone();
        next.remove(id);
        next
    }

    /// Storage encoding: a CBOR array of integers.
    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        let raw: Vec<i64> = self.0.iter().map(|id| id.get()).collect();
        let mut buf = Vec::new();
        ciborium::into_writer(&raw, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Decode the storage encoding. Duplicates fold; an empty buffer is the empty set.
    pub fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        let raw: Vec<i64> =
            ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
        Ok(raw.into_iter().map(ContentId).collect())
    }
}

impl FromIterator<ContentId> for ContentIdSet {
    fn from_iter<I: IntoIterator<Item = ContentId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ContentIdSet {
    type Item = &'a ContentId;
    type IntoIter = std::collections::btree_set::Iter<'a, ContentId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The identity of a grant: `(user, content_type, action)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GrantKey {
    pub user_id: UserId,
    pub content_type: ContentType,
    pub action: Action,
}

impl GrantKey {
    pub const fn new(user_id: UserId, content_type: ContentType, action: Action) -> Self {
        Self {
            user_id,
            content_type,
            action,
        }
    }
}

/// A persisted grant row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub id: GrantId,
    pub user_id: UserId,
    pub content_type: ContentType,
    pub action: Action,
    pub content_ids: ContentIdSet,
    /// Bumped by every persisted change; backs compare-and-swap updates.
    pub version: u64,
}

impl GrantRecord {
    pub fn key(&self) -> GrantKey {
        GrantKey::new(self.user_id, self.content_type, self.action)
    }

    pub fn covers(&self, content_id: ContentId) -> bool {
        self.content_ids.contains(content_id)
    }
}

/// A grant row that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGrant {
    pub user_id: UserId,
    pub content_type: ContentType,
    pub action: Action,
    pub content_ids: ContentIdSet,
}

impl NewGrant {
    pub fn new(key: GrantKey, content_ids: ContentIdSet) -> Self {
        Self {
            user_id: key.user_id,
            content_type: key.content_type,
            action: key.action,
            content_ids,
        }
    }

    pub fn key(&self) -> GrantKey {
        GrantKey::new(self.user_id, self.content_type, self.action)
    }
}

//! Atomic grant mutation.
//!
//! Every operation is a read-plan-apply loop:
//!
//! 1. Take the in-process key locks for the keys the operation touches.
//! 2. Read every row for `(user, content_type)`.
//! 3. Plan a batch of [`GrantChange`]s from that snapshot.
//! 4. Submit the batch with [`GrantStore::apply_grant_changes`]. A conflict
//!    means another writer got there first; re-read and re-plan.
//!
//! The locks serialize callers sharing one mutator. The compare-and-swap
//! batch covers writers the locks cannot see, such as a second process on the
//! same database.

use std::sync::Arc;

use serde::Deserialize;

use liteboard_core::{
    Action, ContentId, ContentIdSet, ContentType, GrantKey, GrantRecord, NewGrant, UserId,
};
use liteboard_store::{ApplyOutcome, GrantChange, GrantStore, GrantStoreExt};

use crate::error::{PermsError, Result};
use crate::locks::KeyedLocks;

/// Tuning for [`GrantMutator`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MutatorConfig {
    /// Read-plan-apply attempts before giving up with `Contention`.
    pub max_attempts: u32,
}

impl Default for MutatorConfig {
    fn default() -> Self {
        Self { max_attempts: 8 }
    }
}

/// Whether a mutation persisted anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Changed,
    Unchanged,
}

impl MutationOutcome {
    pub fn is_changed(self) -> bool {
        self == MutationOutcome::Changed
    }
}

/// Plan adding `content_id` to the `key` tier.
///
/// If legacy data holds several rows for the key, the lowest id is extended.
pub fn plan_add(records: &[GrantRecord], key: GrantKey, content_id: ContentId) -> Vec<GrantChange> {
    let tier: Vec<&GrantRecord> = records.iter().filter(|r| r.key() == key).collect();
    if tier.iter().any(|r| r.covers(content_id)) {
        return Vec::new();
    }

    match tier.into_iter().min_by_key(|r| r.id) {
        Some(existing) => vec![GrantChange::Update {
            id: existing.id,
            expected_version: existing.version,
            content_ids: existing.content_ids.with(content_id),
        }],
        None => vec![GrantChange::Insert(NewGrant::new(
            key,
            ContentIdSet::single(content_id),
        ))],
    }
}

/// Plan dropping `content_id` from every tier except `keep`.
///
/// Rows left empty are deleted.
pub fn plan_remove(
    records: &[GrantRecord],
    content_id: ContentId,
    keep: Option<Action>,
) -> Vec<GrantChange> {
    records
        .iter()
        .filter(|r| Some(r.action) != keep && r.covers(content_id))
        .map(|r| {
            let remaining = r.content_ids.without(content_id);
            if remaining.is_empty() {
                GrantChange::Delete {
                    id: r.id,
                    expected_version: r.version,
                }
            } else {
                GrantChange::Update {
                    id: r.id,
                    expected_version: r.version,
                    content_ids: remaining,
                }
            }
        })
        .collect()
}

/// Plan making `key.action` the only tier that mentions `content_id`.
pub fn plan_retarget(
    records: &[GrantRecord],
    key: GrantKey,
    content_id: ContentId,
) -> Vec<GrantChange> {
    let mut changes = plan_remove(records, content_id, Some(key.action));
    changes.extend(plan_add(records, key, content_id));
    changes
}

/// Adds, removes, and retargets content ids in grant sets without losing
/// concurrent updates.
pub struct GrantMutator<S> {
    store: Arc<S>,
    locks: KeyedLocks,
    config: MutatorConfig,
}

impl<S: GrantStore> GrantMutator<S> {
    pub fn new(store: Arc<S>, config: MutatorConfig) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &MutatorConfig {
        &self.config
    }

    /// Add `content_id` to the `(user, content_type, action)` grant, creating
    /// it if absent. Idempotent.
    pub async fn add(
        &self,
        user_id: UserId,
        content_type: ContentType,
        action: Action,
        content_id: ContentId,
    ) -> Result<MutationOutcome> {
        user_id.validate()?;
        content_id.validate()?;

        let key = GrantKey::new(user_id, content_type, action);
        let _guard = self.locks.lock(&[key]).await;
        let outcome = self
            .apply_planned(user_id, content_type, |records| {
                plan_add(records, key, content_id)
            })
            .await?;

        tracing::debug!(
            user = %user_id,
            content_type = %content_type,
            action = %action,
            content = %content_id,
            outcome = ?outcome,
            "grant add"
        );
        Ok(outcome)
    }

    /// Drop `content_id` from every tier of `(user, content_type)`.
    pub async fn remove(
        &self,
        user_id: UserId,
        content_type: ContentType,
        content_id: ContentId,
    ) -> Result<MutationOutcome> {
        user_id.validate()?;
        content_id.validate()?;

        let _guard = self.locks.lock(&all_tiers(user_id, content_type)).await;
        let outcome = self
            .apply_planned(user_id, content_type, |records| {
                plan_remove(records, content_id, None)
            })
            .await?;

        tracing::debug!(
            user = %user_id,
            content_type = %content_type,
            content = %content_id,
            outcome = ?outcome,
            "grant remove"
        );
        Ok(outcome)
    }

    /// Make `action` the only tier of `(user, content_type)` that mentions
    /// `content_id`. Removal and add land in one batch.
    pub async fn retarget(
        &self,
        user_id: UserId,
        content_type: ContentType,
        action: Action,
        content_id: ContentId,
    ) -> Result<MutationOutcome> {
        user_id.validate()?;
        content_id.validate()?;

        let key = GrantKey::new(user_id, content_type, action);
        let _guard = self.locks.lock(&all_tiers(user_id, content_type)).await;
        let outcome = self
            .apply_planned(user_id, content_type, |records| {
                plan_retarget(records, key, content_id)
            })
            .await?;

        tracing::debug!(
            user = %user_id,
            content_type = %content_type,
            action = %action,
            content = %content_id,
            outcome = ?outcome,
            "grant retarget"
        );
        Ok(outcome)
    }

    async fn apply_planned<F>(
        &self,
        user_id: UserId,
        content_type: ContentType,
        plan: F,
    ) -> Result<MutationOutcome>
    where
        F: Fn(&[GrantRecord]) -> Vec<GrantChange>,
    {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let records = self.store.grants_for(user_id, content_type).await?;
            let changes = plan(&records);
            if changes.is_empty() {
                return Ok(MutationOutcome::Unchanged);
            }

            match self.store.apply_grant_changes(&changes).await? {
                ApplyOutcome::Applied => return Ok(MutationOutcome::Changed),
                ApplyOutcome::Conflict => {
                    tracing::warn!(
                        user = %user_id,
                        content_type = %content_type,
                        attempt,
                        "grant batch conflicted, re-reading"
                    );
                }
            }
        }

        Err(PermsError::Contention {
            user_id,
            content_type,
            attempts,
        })
    }
}

fn all_tiers(user_id: UserId, content_type: ContentType) -> [GrantKey; 3] {
    Action::ALL.map(|action| GrantKey::new(user_id, content_type, action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use liteboard_core::GrantId;
    use liteboard_store::{GrantFilter, MemoryStore};

    use crate::evaluator::effective_level;

    fn record(id: i64, action: Action, ids: &[i64]) -> GrantRecord {
        GrantRecord {
            id: GrantId(id),
            user_id: UserId(1),
            content_type: ContentType::Project,
            action,
            content_ids: ids.iter().copied().map(ContentId).collect(),
            version: 3,
        }
    }

    fn key(action: Action) -> GrantKey {
        GrantKey::new(UserId(1), ContentType::Project, action)
    }

    #[test]
    fn test_plan_add_inserts_when_tier_missing() {
        let records = vec![record(1, Action::Admin, &[5])];
        let changes = plan_add(&records, key(Action::Read), ContentId(5));
        assert_eq!(
            changes,
            vec![GrantChange::Insert(NewGrant::new(
                key(Action::Read),
                ContentIdSet::single(ContentId(5))
            ))]
        );
    }

    #[test]
    fn test_plan_add_extends_lowest_duplicate() {
        let records = vec![record(4, Action::Read, &[1]), record(2, Action::Read, &[2])];
        let changes = plan_add(&records, key(Action::Read), ContentId(9));
        assert_eq!(
            changes,
            vec![GrantChange::Update {
                id: GrantId(2),
                expected_version: 3,
                content_ids: [2, 9].into_iter().map(ContentId).collect(),
            }]
        );

        // Already covered by any duplicate: nothing to do
        assert!(plan_add(&records, key(Action::Read), ContentId(1)).is_empty());
    }

    #[test]
    fn test_plan_remove_deletes_emptied_rows() {
        let records = vec![
            record(1, Action::Read, &[5]),
            record(2, Action::Write, &[5, 6]),
            record(3, Action::Admin, &[6]),
        ];
        let changes = plan_remove(&records, ContentId(5), None);
        assert_eq!(
            changes,
            vec![
                GrantChange::Delete {
                    id: GrantId(1),
                    expected_version: 3
                },
                GrantChange::Update {
                    id: GrantId(2),
                    expected_version: 3,
                    content_ids: ContentIdSet::single(ContentId(6)),
                },
            ]
        );
    }

    #[test]
    fn test_plan_retarget_keeps_only_target_tier() {
        let records = vec![
            record(1, Action::Admin, &[42]),
            record(2, Action::Read, &[42, 7]),
        ];
        let changes = plan_retarget(&records, key(Action::Write), ContentId(42));
        assert_eq!(changes.len(), 3);
        assert!(matches!(changes[2], GrantChange::Insert(_)));

        // Retargeting onto the tier already held still strips the others
        let changes = plan_retarget(&records, key(Action::Read), ContentId(42));
        assert_eq!(
            changes,
            vec![GrantChange::Delete {
                id: GrantId(1),
                expected_version: 3
            }]
        );
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let mutator = GrantMutator::new(Arc::clone(&store), MutatorConfig::default());

        let first = mutator
            .add(UserId(1), ContentType::Project, Action::Read, ContentId(5))
            .await
            .unwrap();
        let second = mutator
            .add(UserId(1), ContentType::Project, Action::Read, ContentId(5))
            .await
            .unwrap();
        assert_eq!(first, MutationOutcome::Changed);
        assert_eq!(second, MutationOutcome::Unchanged);

        let rows = store.query_grants(&GrantFilter::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content_ids.len(), 1);
    }

    #[tokio::test]
    async fn test_retarget_downgrades_admin() {
        let store = Arc::new(MemoryStore::new());
        let mutator = GrantMutator::new(Arc::clone(&store), MutatorConfig::default());

        mutator
            .add(UserId(1), ContentType::Project, Action::Admin, ContentId(42))
            .await
            .unwrap();
        mutator
            .retarget(UserId(1), ContentType::Project, Action::Write, ContentId(42))
            .await
            .unwrap();

        let rows = store
            .grants_for(UserId(1), ContentType::Project)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, Action::Write);
        assert_eq!(
            effective_level(&rows, ContentId(42)),
            liteboard_core::PermissionLevel::Write
        );
    }

    #[tokio::test]
    async fn test_remove_clears_every_tier() {
        let store = Arc::new(MemoryStore::new());
        let mutator = GrantMutator::new(Arc::clone(&store), MutatorConfig::default());

        for action in Action::ALL {
            mutator
                .add(UserId(1), ContentType::ContentList, action, ContentId(3))
                .await
                .unwrap();
        }
        mutator
            .add(UserId(1), ContentType::ContentList, Action::Read, ContentId(4))
            .await
            .unwrap();

        let outcome = mutator
            .remove(UserId(1), ContentType::ContentList, ContentId(3))
            .await
            .unwrap();
        assert!(outcome.is_changed());

        let rows = store
            .grants_for(UserId(1), ContentType::ContentList)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content_ids, ContentIdSet::single(ContentId(4)));

        let again = mutator
            .remove(UserId(1), ContentType::ContentList, ContentId(3))
            .await
            .unwrap();
        assert_eq!(again, MutationOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_invalid_ids_touch_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mutator = GrantMutator::new(Arc::clone(&store), MutatorConfig::default());

        let err = mutator
            .add(UserId(1), ContentType::Project, Action::Read, ContentId(0))
            .await
            .unwrap_err();
        assert!(matches!(err, PermsError::InvalidInput(_)));
        assert!(store
            .query_grants(&GrantFilter::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_config_from_json_defaults_missing_fields() {
        let config: MutatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MutatorConfig::default());
        let config: MutatorConfig = serde_json::from_str(r#"{"max_attempts": 2}"#).unwrap();
        assert_eq!(config.max_attempts, 2);
    }
}

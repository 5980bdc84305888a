//! Permission evaluation.
//!
//! Every check re-reads the grant rows for `(user, content_type)` and takes the
//! ceiling of the tiers that mention the content id. Nothing is cached.

use std::sync::Arc;

use liteboard_core::{
    Action, ContentId, ContentType, GrantRecord, PermissionLevel, UserId,
};
use liteboard_store::{GrantStore, GrantStoreExt};

use crate::error::Result;

/// Highest level any of `records` grants on `content_id`.
pub fn effective_level(records: &[GrantRecord], content_id: ContentId) -> PermissionLevel {
    records
        .iter()
        .filter(|r| r.covers(content_id))
        .map(|r| r.action.level())
        .max()
        .unwrap_or(PermissionLevel::None)
}

/// Answers "may user U perform action A on item C of type T".
pub struct Evaluator<S> {
    store: Arc<S>,
}

impl<S> Clone for Evaluator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: GrantStore> Evaluator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Effective level of `user_id` on one content item.
    pub async fn level(
        &self,
        user_id: UserId,
        content_type: ContentType,
        content_id: ContentId,
    ) -> Result<PermissionLevel> {
        user_id.validate()?;
        content_id.validate()?;

        let records = self.store.grants_for(user_id, content_type).await?;
        let level = effective_level(&records, content_id);
        tracing::debug!(
            user = %user_id,
            content_type = %content_type,
            content = %content_id,
            level = ?level,
            rows = records.len(),
            "evaluated permission level"
        );
        Ok(level)
    }

    pub async fn has_permission(
        &self,
        user_id: UserId,
        content_type: ContentType,
        content_id: ContentId,
        required: Action,
    ) -> Result<bool> {
        let level = self.level(user_id, content_type, content_id).await?;
        Ok(level.satisfies(required))
    }

    /// String-level check. Unknown content types and actions are denied
    /// without touching storage.
    pub async fn check(
        &self,
        user_id: UserId,
        content_type: &str,
        content_id: ContentId,
        action: &str,
    ) -> Result<bool> {
        let (Ok(content_type), Ok(required)) =
            (content_type.parse::<ContentType>(), action.parse::<Action>())
        else {
            tracing::debug!(content_type, action, "unknown tag, denying");
            return Ok(false);
        };
        self.has_permission(user_id, content_type, content_id, required)
            .await
    }
}

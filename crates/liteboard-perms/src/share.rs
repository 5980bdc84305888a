//! Share token service.
//!
//! Tokens are bearer credentials for one tier on one project. They stay
//! redeemable by any number of users until they expire or are deleted.
//! Expiry is checked against the clock on every list and every redeem; there
//! is no sweeper.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;

use liteboard_core::{
    Clock, ContentId, ContentType, NewShareToken, ShareLevel, ShareToken, ShareTokenId, UserId,
    ValidationError, SECONDS_PER_HOUR,
};
use liteboard_store::{GrantStore, ShareTokenStore};

use crate::error::{PermsError, Result};
use crate::mutator::GrantMutator;

/// Lower bound on token entropy, in bytes.
pub const MIN_TOKEN_BYTES: usize = 32;

/// Token issuing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShareTokenConfig {
    /// Lifetime used when a caller passes no lifetime or zero.
    pub default_ttl_hours: i64,
    /// Random bytes per token. Values below 32 are raised to 32.
    pub token_bytes: usize,
}

impl Default for ShareTokenConfig {
    fn default() -> Self {
        Self {
            default_ttl_hours: 24,
            token_bytes: MIN_TOKEN_BYTES,
        }
    }
}

/// Compute `expires_at` for a token issued at `now`.
pub fn expiry_for(now: i64, expires_in_hours: Option<i64>, default_hours: i64) -> Result<i64> {
    let hours = match expires_in_hours {
        None | Some(0) => default_hours,
        Some(h) => h,
    };
    if hours <= 0 {
        return Err(ValidationError::InvalidLifetime(hours).into());
    }
    hours
        .checked_mul(SECONDS_PER_HOUR)
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| ValidationError::InvalidLifetime(hours).into())
}

/// A fresh URL-safe token value from the OS random source.
fn new_token_value(len: usize) -> Result<String> {
    let mut bytes = vec![0u8; len.max(MIN_TOKEN_BYTES)];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| PermsError::TokenGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// Issues, lists, deletes, and redeems share tokens.
pub struct ShareTokenService<S> {
    store: Arc<S>,
    mutator: Arc<GrantMutator<S>>,
    clock: Arc<dyn Clock>,
    config: ShareTokenConfig,
}

impl<S: GrantStore + ShareTokenStore> ShareTokenService<S> {
    pub fn new(
        store: Arc<S>,
        mutator: Arc<GrantMutator<S>>,
        clock: Arc<dyn Clock>,
        config: ShareTokenConfig,
    ) -> Self {
        Self {
            store,
            mutator,
            clock,
            config,
        }
    }

    /// Issue a token for `project_id`. `None` or zero hours means the
    /// configured default.
    pub async fn generate(
        &self,
        project_id: ContentId,
        level: ShareLevel,
        expires_in_hours: Option<i64>,
    ) -> Result<ShareToken> {
        project_id.validate()?;
        let now = self.clock.now_secs();
        let expires_at = expiry_for(now, expires_in_hours, self.config.default_ttl_hours)?;

        let new = NewShareToken {
            token: new_token_value(self.config.token_bytes)?,
            project_id,
            permission_level: level,
            created_at: now,
            expires_at,
        };
        let id = self.store.insert_share_token(&new).await?;

        tracing::info!(
            project = %project_id,
            level = %level,
            token_id = %id,
            expires_at,
            "issued share token"
        );
        Ok(new.into_stored(id))
    }

    /// Tokens for `project_id` that are still active.
    pub async fn list(&self, project_id: ContentId) -> Result<Vec<ShareToken>> {
        project_id.validate()?;
        let now = self.clock.now_secs();
        let mut tokens = self.store.share_tokens_for_project(project_id).await?;
        tokens.retain(|t| t.is_active(now));
        Ok(tokens)
    }

    /// Hard delete, whether or not the token has expired. Returns whether a
    /// token was removed.
    pub async fn delete(&self, token_id: ShareTokenId) -> Result<bool> {
        token_id.validate()?;
        let removed = self.store.delete_share_token(token_id).await?;
        tracing::debug!(token_id = %token_id, removed, "deleted share token");
        Ok(removed)
    }

    /// Grant the token's tier on its project to `user_id`. Redeeming twice
    /// grants nothing extra.
    pub async fn redeem(&self, token: &str, user_id: UserId) -> Result<ContentId> {
        user_id.validate()?;
        if token.is_empty() {
            return Err(PermsError::NotFound("share token".into()));
        }

        let share = self
            .store
            .get_share_token(token)
            .await?
            .ok_or_else(|| PermsError::NotFound("share token".into()))?;

        let now = self.clock.now_secs();
        if !share.is_active(now) {
            return Err(PermsError::Expired {
                expires_at: share.expires_at,
            });
        }

        self.mutator
            .add(
                user_id,
                ContentType::Project,
                share.permission_level.action(),
                share.project_id,
            )
            .await?;

        tracing::info!(
            user = %user_id,
            project = %share.project_id,
            level = %share.permission_level,
            "redeemed share token"
        );
        Ok(share.project_id)
    }
}

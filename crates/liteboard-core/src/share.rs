//! Share tokens: bearer credentials granting one tier on one project.
//!
//! Lifecycle: `Active` until `expires_at <= now` (expired) or the row is
//! deleted. Redemption does not change the token; it may be redeemed by any
//! number of users until then.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::access::ShareLevel;
use crate::types::{ContentId, ShareTokenId};

pub const SECONDS_PER_HOUR: i64 = 3600;

/// A stored share token. Timestamps are Unix seconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareToken {
    pub id: ShareTokenId,
    pub token: String,
    pub project_id: ContentId,
    pub permission_level: ShareLevel,
    pub created_at: i64,
    pub expires_at: i64,
}

impl ShareToken {
    /// Still redeemable at `now`.
    pub fn is_active(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

// The bearer value stays out of logs.
impl fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareToken")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("permission_level", &self.permission_level)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A share token that has not been stored yet.
#[derive(Clone, PartialEq, Eq)]
pub struct NewShareToken {
    pub token: String,
    pub project_id: ContentId,
    pub permission_level: ShareLevel,
    pub created_at: i64,
    pub expires_at: i64,
}

impl NewShareToken {
    pub fn into_stored(self, id: ShareTokenId) -> ShareToken {
        ShareToken {
            id,
            token: self.token,
            project_id: self.project_id,
            permission_level: self.permission_level,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for NewShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewShareToken")
            .field("project_id", &self.project_id)
            .field("permission_level", &self.permission_level)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: i64) -> ShareToken {
        ShareToken {
            id: ShareTokenId(1),
            token: "secret-value".to_string(),
            project_id: ContentId(42),
            permission_level: ShareLevel::Read,
            created_at: 0,
            expires_at,
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let t = token(1000);
        assert!(t.is_active(999));
        assert!(!t.is_active(1000)); // expires_at <= now is dead
        assert!(!t.is_active(1001));
    }

    #[test]
    fn test_debug_redacts_bearer_value() {
        let debug = format!("{:?}", token(10));
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("redacted"));
    }
}

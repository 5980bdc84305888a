//! Strong identifier types.
//!
//! All identifiers are `i64` newtypes so a user id can never be passed where
//! a content id is expected. Storage assigns them; callers must only ever see
//! positive values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw value without validation.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// The raw integer value.
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Reject zero and negative ids.
            pub fn validate(self) -> Result<Self, ValidationError> {
                if self.0 > 0 {
                    Ok(self)
                } else {
                    Err(ValidationError::NonPositiveId {
                        field: $field,
                        value: self.0,
                    })
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// A resolved user identity. Authentication happens elsewhere.
    UserId,
    "user_id"
);

id_type!(
    /// The id of one content item (project, content list, entry, ...).
    ContentId,
    "content_id"
);

id_type!(
    /// Storage id of a grant record.
    GrantId,
    "grant_id"
);

id_type!(
    /// Storage id of a share token row (not the bearer value).
    ShareTokenId,
    "share_token_id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_non_positive() {
        assert!(UserId(1).validate().is_ok());
        assert_eq!(
            UserId(0).validate(),
            Err(ValidationError::NonPositiveId {
                field: "user_id",
                value: 0
            })
        );
        assert!(ContentId(-7).validate().is_err());
    }

    #[test]
    fn test_id_display_and_debug() {
        assert_eq!(format!("{}", ContentId(42)), "42");
        assert_eq!(format!("{:?}", GrantId(3)), "GrantId(3)");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId(9)).unwrap();
        assert_eq!(json, "9");
    }
}

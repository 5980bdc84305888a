//! Content types, action tiers, and permission levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The resource kind a grant or content id set applies to.
///
/// The set is closed: an unknown tag never parses, and the string-level
/// permission check answers "deny" for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Project,
    ContentList,
    ContentEntry,
    User,
    DetailPermission,
    Permission,
}

impl ContentType {
    /// All known content types.
    pub const ALL: [ContentType; 6] = [
        ContentType::Project,
        ContentType::ContentList,
        ContentType::ContentEntry,
        ContentType::User,
        ContentType::DetailPermission,
        ContentType::Permission,
    ];

    /// The storage tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ContentType::Project => "project",
            ContentType::ContentList => "content_list",
            ContentType::ContentEntry => "content_entry",
            ContentType::User => "user",
            ContentType::DetailPermission => "detail_permission",
            ContentType::Permission => "permission",
        }
    }

    /// Whether creating an item of this type seeds admin+read grants for the creator.
    pub const fn is_creatable(&self) -> bool {
        matches!(
            self,
            ContentType::Project | ContentType::ContentList | ContentType::ContentEntry
        )
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownContentType(s.to_string()))
    }
}

/// A stored action tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Admin,
}

impl Action {
    /// All tiers in ascending order. Multi-key locks are taken in this order.
    pub const ALL: [Action; 3] = [Action::Read, Action::Write, Action::Admin];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Admin => "admin",
        }
    }

    /// The comparable level of this tier.
    pub const fn level(&self) -> PermissionLevel {
        match self {
            Action::Read => PermissionLevel::Read,
            Action::Write => PermissionLevel::Write,
            Action::Admin => PermissionLevel::Admin,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            "admin" => Ok(Action::Admin),
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }
}

/// Totally ordered access level: `None < Read < Write < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum PermissionLevel {
    #[default]
    None = 0,
    Read = 1,
    Write = 2,
    Admin = 3,
}

impl PermissionLevel {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// The tier that reaches this level, if any.
    pub const fn action(self) -> Option<Action> {
        match self {
            PermissionLevel::None => None,
            PermissionLevel::Read => Some(Action::Read),
            PermissionLevel::Write => Some(Action::Write),
            PermissionLevel::Admin => Some(Action::Admin),
        }
    }

    /// Whether this level satisfies a check for `required`.
    pub fn satisfies(self, required: Action) -> bool {
        self >= required.level()
    }
}

/// Map an action string to its level. Total: unknown strings are `None`.
pub fn permission_level(action: &str) -> PermissionLevel {
    action
        .parse::<Action>()
        .map(|a| a.level())
        .unwrap_or(PermissionLevel::None)
}

/// The tiers a share token may delegate. Admin is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareLevel {
    Read,
    Write,
}

impl ShareLevel {
    pub const fn as_str(&self) -> &'static str {
        self.action().as_str()
    }

    pub const fn action(&self) -> Action {
        match self {
            ShareLevel::Read => Action::Read,
            ShareLevel::Write => Action::Write,
        }
    }
}

impl fmt::Display for ShareLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<Action> for ShareLevel {
    type Error = ValidationError;

    fn try_from(action: Action) -> Result<Self, Self::Error> {
        match action {
            Action::Read => Ok(ShareLevel::Read),
            Action::Write => Ok(ShareLevel::Write),
            Action::Admin => Err(ValidationError::InvalidShareLevel("admin".to_string())),
        }
    }
}

impl FromStr for ShareLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(ShareLevel::Read),
            "write" => Ok(ShareLevel::Write),
            other => Err(ValidationError::InvalidShareLevel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_level_mapping() {
        assert_eq!(permission_level("read"), PermissionLevel::Read);
        assert_eq!(permission_level("write"), PermissionLevel::Write);
        assert_eq!(permission_level("admin"), PermissionLevel::Admin);
        assert_eq!(permission_level("owner"), PermissionLevel::None);
        assert_eq!(permission_level(""), PermissionLevel::None);
        assert_eq!(permission_level("READ"), PermissionLevel::None);
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(PermissionLevel::None < PermissionLevel::Read);
        assert!(PermissionLevel::Read < PermissionLevel::Write);
        assert!(PermissionLevel::Write < PermissionLevel::Admin);
        assert_eq!(PermissionLevel::Admin.as_u8(), 3);
    }

    #[test]
    fn test_admin_satisfies_lower_tiers() {
        assert!(PermissionLevel::Admin.satisfies(Action::Read));
        assert!(PermissionLevel::Admin.satisfies(Action::Write));
        assert!(!PermissionLevel::Read.satisfies(Action::Write));
        assert!(!PermissionLevel::None.satisfies(Action::Read));
    }

    #[test]
    fn test_content_type_tags() {
        for ct in ContentType::ALL {
            assert_eq!(ct.as_str().parse::<ContentType>().unwrap(), ct);
        }
        assert!("sidebar".parse::<ContentType>().is_err());
        assert!(ContentType::Project.is_creatable());
        assert!(!ContentType::User.is_creatable());
    }

    #[test]
    fn test_share_level_rejects_admin() {
        assert_eq!(ShareLevel::try_from(Action::Write).unwrap(), ShareLevel::Write);
        assert!(ShareLevel::try_from(Action::Admin).is_err());
        assert!("admin".parse::<ShareLevel>().is_err());
        assert!("root".parse::<ShareLevel>().is_err());
        assert_eq!("read".parse::<ShareLevel>().unwrap(), ShareLevel::Read);
    }

    #[test]
    fn test_action_serde_uses_storage_tags() {
        assert_eq!(serde_json::to_string(&Action::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::to_string(&ContentType::ContentEntry).unwrap(),
            "\"content_entry\""
        );
    }
}

//! Views returned by aggregation queries.

use serde::{Deserialize, Serialize};

use crate::access::Action;
use crate::types::{ContentId, UserId};

/// A project as resolved from the content repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ContentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub creator_id: UserId,
}

/// Profile info for a user, from the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// One user's highest tier on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub level: Action,
}

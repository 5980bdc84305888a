//! # Liteboard Core
//!
//! Pure types for the Liteboard access engine: identifiers, action tiers,
//! grant records, share tokens, and the clock abstraction.
//!
//! This crate contains no I/O and no storage. Everything here can be
//! constructed and compared without a runtime.
//!
//! ## Key Types
//!
//! - [`UserId`], [`ContentId`] - Positive integer identities
//! - [`ContentType`] - Which resource kind a grant applies to
//! - [`Action`] / [`PermissionLevel`] - The ordered tiers `read < write < admin`
//! - [`GrantRecord`] - One persisted `(user, content_type, action, ids)` row
//! - [`ShareToken`] - A time-bounded bearer credential for one project
//!
//! ## Action Tiers
//!
//! Tiers are stored as disjoint, action-tagged id sets. Evaluation takes the
//! ceiling: an `admin` grant satisfies `read` and `write` checks for the same
//! content id even though no `read` row mentions it.

pub mod access;
pub mod clock;
pub mod error;
pub mod grant;
pub mod model;
pub mod share;
pub mod types;

pub use access::{permission_level, Action, ContentType, PermissionLevel, ShareLevel};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, ValidationError};
pub use grant::{ContentIdSet, GrantKey, GrantRecord, NewGrant};
pub use model::{Project, ProjectMember, UserProfile};
pub use share::{NewShareToken, ShareToken, SECONDS_PER_HOUR};
pub use types::{ContentId, GrantId, ShareTokenId, UserId};

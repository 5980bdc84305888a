//! # Liteboard Permissions
//!
//! Permission evaluation, grant mutation, and share tokens.
//!
//! ## Overview
//!
//! Access is stored as action-tagged id sets: one row per
//! `(user, content_type, action)` listing the content ids that tier covers.
//! Tiers are disjoint in storage and cumulative in evaluation.
//!
//! ## Key Types
//!
//! - [`Evaluator`] - Computes the effective level of a user on one item
//! - [`GrantMutator`] - Add / Remove / Retarget, atomic per key
//! - [`ShareTokenService`] - Time-bounded delegation tokens
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use liteboard_core::{Action, ContentId, ContentType, UserId};
//! use liteboard_perms::{Evaluator, GrantMutator, MutatorConfig};
//! use liteboard_store::MemoryStore;
//!
//! async fn example() {
//!     let store = Arc::new(MemoryStore::new());
//!     let mutator = GrantMutator::new(store.clone(), MutatorConfig::default());
//!     let evaluator = Evaluator::new(store);
//!
//!     mutator
//!         .add(UserId(1), ContentType::Project, Action::Admin, ContentId(42))
//!         .await
//!         .unwrap();
//!     let ok = evaluator
//!         .has_permission(UserId(1), ContentType::Project, ContentId(42), Action::Read)
//!         .await
//!         .unwrap();
//!     assert!(ok);
//! }
//! ```

pub mod error;
pub mod evaluator;
pub mod locks;
pub mod mutator;
pub mod share;

pub use error::{PermsError, Result};
pub use evaluator::{effective_level, Evaluator};
pub use mutator::{
    plan_add, plan_remove, plan_retarget, GrantMutator, MutationOutcome, MutatorConfig,
};
pub use share::{expiry_for, ShareTokenConfig, ShareTokenService, MIN_TOKEN_BYTES};

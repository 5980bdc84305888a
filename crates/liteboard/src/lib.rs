//! # Liteboard
//!
//! Authorization and sharing engine for a multi-tenant content board.
//!
//! ## Overview
//!
//! Projects contain content lists and entries. Access to each item is a
//! per-user, per-tier grant set, not a role. This crate answers "may user U
//! perform action A on item C of type T", keeps grant sets consistent under
//! concurrent writers, and issues time-bounded share tokens.
//!
//! ## Key Concepts
//!
//! - **Grant**: one row per `(user, content_type, action)` listing content ids
//! - **Tier**: read < write < admin. Stored disjoint, evaluated cumulatively
//! - **Share token**: bearer credential for read or write on one project
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use liteboard::{Board, BoardConfig, MemoryContentRepository, MemoryDirectory};
//! use liteboard::core::{Action, ContentType, SystemClock, UserId};
//! use liteboard::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("liteboard.db").unwrap();
//!     let board = Board::new(
//!         store,
//!         Arc::new(MemoryContentRepository::new()),
//!         Arc::new(MemoryDirectory::new()),
//!         Arc::new(SystemClock),
//!         BoardConfig::default(),
//!     );
//!
//!     let project = board
//!         .create_content(UserId(1), ContentType::Project, serde_json::json!({"name": "alpha"}))
//!         .await
//!         .unwrap();
//!     assert!(board
//!         .has_permission(UserId(1), ContentType::Project, project, Action::Admin)
//!         .await
//!         .unwrap());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `liteboard::core` - Ids, tiers, grant and token types
//! - `liteboard::store` - Storage traits, SQLite and in-memory backends
//! - `liteboard::perms` - Evaluator, mutator, share token service

pub mod board;
pub mod collab;
pub mod config;
pub mod error;

pub use liteboard_core as core;
pub use liteboard_perms as perms;
pub use liteboard_store as store;

pub use board::Board;
pub use collab::{ContentRepository, IdentityDirectory, MemoryContentRepository, MemoryDirectory};
pub use config::BoardConfig;
pub use error::{BoardError, Result};

pub use liteboard_core::{
    Action, ContentId, ContentType, GrantRecord, PermissionLevel, Project, ProjectMember,
    ShareLevel, ShareToken, ShareTokenId, UserId, UserProfile,
};
pub use liteboard_perms::MutationOutcome;

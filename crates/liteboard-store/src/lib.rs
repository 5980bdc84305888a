//! # Liteboard Store
//!
//! Storage abstraction for grant records and share tokens, with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! The engine never holds grants in memory between calls: every evaluation
//! re-reads storage through the [`GrantStore`] trait. Share tokens live behind
//! [`ShareTokenStore`]. [`SqliteStore`] is the persistent backend and
//! [`MemoryStore`] mirrors its semantics for tests.
//!
//! ## Key Types
//!
//! - [`GrantStore`] - Query/insert/update/delete of grant rows, plus atomic batches
//! - [`ShareTokenStore`] - Persistence for share tokens
//! - [`GrantFilter`] - Optional equality filters for grant queries
//! - [`GrantChange`] / [`ApplyOutcome`] - Compare-and-swap batches
//!
//! ## Usage
//!
//! ```rust,no_run
//! use liteboard_core::{ContentType, UserId};
//! use liteboard_store::{GrantFilter, GrantStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("liteboard.db").unwrap();
//!
//!     let filter = GrantFilter::new()
//!         .user(UserId(1))
//!         .content_type(ContentType::Project);
//!     let grants = store.query_grants(&filter).await.unwrap();
//!     println!("{} grant rows", grants.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No uniqueness constraint**: one live row per `(user, content_type, action)`
//!   is kept by the mutator protocol, not by the schema.
//! - **Versioned rows**: each change bumps `version`, so batches can be applied
//!   only if nothing changed since they were planned.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    ApplyOutcome, GrantChange, GrantFilter, GrantStore, GrantStoreExt, ShareTokenStore,
};

//! # Liteboard Testkit
//!
//! Testing utilities for Liteboard.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a board over in-memory collaborators and a manual clock
//! - **Generators**: Proptest strategies for ids, tiers, and grant sets
//! - **Reference model**: [`GrantModel`], the tier-per-id view mutations must agree with
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use liteboard_testkit::generators::{grant_ops, GrantModel};
//!
//! proptest! {
//!     #[test]
//!     fn model_accepts_any_sequence(ops in grant_ops(32)) {
//!         let mut model = GrantModel::new();
//!         for op in ops {
//!             model.apply(op);
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use liteboard_testkit::fixtures::multi_user_fixture;
//!
//! let fixture = multi_user_fixture(3);
//! let project = fixture.create_project(liteboard::UserId(1), "alpha").await?;
//! fixture.clock.advance_hours(25);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_user_fixture, TestFixture, FIXTURE_START};
pub use generators::{grant_ops, GrantModel, GrantOp, GrantSetParams};

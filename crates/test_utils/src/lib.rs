//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! warranty claims test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data (file signatures, users, costs)
//! - `builders`: Builder patterns for claim and item input
//! - `harness`: A claim workflow wired to in-memory adapters
//! - `database`: PostgreSQL testcontainer with the schema applied
//! - `assertions`: Custom assertion helpers for claim results
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;

//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the warranty claims domain, built on SQLx.
//!
//! # Architecture
//!
//! - [`PgUnitOfWork`] hands out transactions (`PgTx`) to the claim workflow
//! - `repositories` implement the transactional repository ports of the
//!   claim aggregate (claims, items, attachments, history)
//! - `adapters` implement the remaining ports backed by the database
//!   (the user directory)
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, claim_stores, DatabaseConfig, PgUnitOfWork};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/warranty")).await?;
//! let uow = PgUnitOfWork::new(pool.clone());
//! let stores = claim_stores(&pool);
//! ```

pub mod pool;
pub mod error;
pub mod unit_of_work;
pub mod repositories;
pub mod adapters;

use std::sync::Arc;

use domain_claims::ClaimStores;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use unit_of_work::{IsolationLevel, PgTx, PgUnitOfWork};
pub use repositories::{
    PostgresAttachmentRepository, PostgresClaimRepository, PostgresHistoryRepository,
    PostgresItemRepository,
};
pub use adapters::PostgresUserDirectory;

/// Wires the four claim repositories onto one pool
pub fn claim_stores(pool: &DatabasePool) -> ClaimStores<PgTx> {
    ClaimStores::new(
        Arc::new(PostgresClaimRepository::new(pool.clone())),
        Arc::new(PostgresItemRepository::new(pool.clone())),
        Arc::new(PostgresAttachmentRepository::new(pool.clone())),
        Arc::new(PostgresHistoryRepository::new(pool.clone())),
    )
}

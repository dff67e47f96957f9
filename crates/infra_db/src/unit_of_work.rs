//! PostgreSQL unit of work
//!
//! Hands out `sqlx` transactions to the claim workflow. With
//! [`IsolationLevel::Serializable`] concurrent workload checks for the same
//! technician cannot both pass; the loser fails with a serialization error
//! that surfaces as `PortError::Conflict`.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use tracing::{debug, instrument};

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_claims::UnitOfWork;

use crate::error::DatabaseError;

/// Transaction handle used by every PostgreSQL repository
pub type PgTx = sqlx::Transaction<'static, Postgres>;

/// Transaction isolation requested on `begin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn statement(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::ReadCommitted => None,
            IsolationLevel::RepeatableRead => Some("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
    isolation: IsolationLevel,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            isolation: IsolationLevel::default(),
        }
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PgUnitOfWork {}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Tx = PgTx;

    #[instrument(skip(self), fields(isolation = ?self.isolation))]
    async fn begin(&self) -> Result<PgTx, PortError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        if let Some(statement) = self.isolation.statement() {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from)?;
        }
        debug!("Transaction started");
        Ok(tx)
    }

    async fn commit(&self, tx: PgTx) -> Result<(), PortError> {
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn rollback(&self, tx: PgTx) -> Result<(), PortError> {
        tx.rollback()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl HealthCheckable for PgUnitOfWork {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-unit-of-work".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-unit-of-work".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_committed_needs_no_statement() {
        assert_eq!(IsolationLevel::ReadCommitted.statement(), None);
        assert!(IsolationLevel::Serializable
            .statement()
            .is_some_and(|s| s.ends_with("SERIALIZABLE")));
    }
}

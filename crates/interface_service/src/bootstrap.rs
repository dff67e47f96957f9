//! Wiring of the PostgreSQL and filesystem adapters into a claim workflow

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};
use domain_claims::{ClaimWorkflow, Collaborators, SignatureSniffer};
use infra_db::{
    claim_stores, create_pool, DatabaseError, DatabasePool, PgUnitOfWork, PostgresUserDirectory,
};
use infra_storage::{LocalFileStorage, StorageError};

use crate::config::ServiceConfig;

/// The claim workflow backed by PostgreSQL
pub type PgClaimWorkflow = ClaimWorkflow<PgUnitOfWork>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database unavailable: {0}")]
    Database(#[from] DatabaseError),

    #[error("attachment storage unusable: {0}")]
    Storage(#[from] StorageError),
}

/// A fully wired service instance
pub struct ServiceContext {
    pub pool: DatabasePool,
    pub workflow: PgClaimWorkflow,
    pub users: Arc<PostgresUserDirectory>,
    health_checks: Vec<Arc<dyn HealthCheckable>>,
}

impl ServiceContext {
    /// Connects to the database, checks the storage root and builds the workflow
    pub async fn bootstrap(config: &ServiceConfig) -> Result<Self, BootstrapError> {
        let pool = create_pool(config.database()).await?;

        let mut storage = LocalFileStorage::new(&config.storage_root, config.storage_base_url.clone());
        if let Some(limit) = config.max_upload_bytes {
            storage = storage.with_max_upload_bytes(limit);
        }
        storage.validate().await?;
        info!(root = %config.storage_root.display(), "Attachment storage ready");

        Ok(Self::assemble(config, pool, storage))
    }

    /// Builds the workflow on an existing pool and storage
    pub fn assemble(config: &ServiceConfig, pool: DatabasePool, storage: LocalFileStorage) -> Self {
        let uow = Arc::new(PgUnitOfWork::new(pool.clone()).with_isolation(config.isolation()));
        let users = Arc::new(PostgresUserDirectory::new(pool.clone()));
        let storage = Arc::new(storage);

        let collaborators = Collaborators {
            users: users.clone(),
            storage: storage.clone(),
            sniffer: Arc::new(SignatureSniffer::new()),
        };

        let mut workflow =
            ClaimWorkflow::new(uow.clone(), claim_stores(&pool), collaborators, config.policy);
        if let Some(deadline) = config.transaction_timeout() {
            workflow = workflow.with_deadline(deadline);
        }

        info!(
            isolation = ?config.isolation(),
            max_claims_per_technician = config.policy.max_claims_per_technician,
            "Claim workflow assembled"
        );

        Self {
            pool,
            workflow,
            users: users.clone(),
            health_checks: vec![
                uow as Arc<dyn HealthCheckable>,
                users as Arc<dyn HealthCheckable>,
                storage as Arc<dyn HealthCheckable>,
            ],
        }
    }

    /// Runs every adapter's health check
    pub async fn health_report(&self) -> Vec<HealthCheckResult> {
        let mut results = Vec::with_capacity(self.health_checks.len());
        for check in &self.health_checks {
            let result = check.health_check().await;
            if result.status != AdapterHealth::Healthy {
                warn!(
                    adapter = %result.adapter_id,
                    message = ?result.message,
                    "Adapter is not healthy"
                );
            }
            results.push(result);
        }
        results
    }
}

/// True when every adapter reported healthy
pub fn all_healthy(results: &[HealthCheckResult]) -> bool {
    results.iter().all(|r| r.status == AdapterHealth::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(status: AdapterHealth) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "stub-adapter".to_string(),
            status,
            latency_ms: 1,
            message: None,
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_degraded_adapter_fails_the_report() {
        assert!(all_healthy(&[result(AdapterHealth::Healthy)]));
        assert!(!all_healthy(&[
            result(AdapterHealth::Healthy),
            result(AdapterHealth::Degraded),
        ]));
    }
}

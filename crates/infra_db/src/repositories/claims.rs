//! Claims repository implementation
//!
//! Persists the claim aggregate root in the `claims` table. Updates are
//! guarded by the `version` column: a write only lands if the row still
//! carries the version the caller read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{ClaimId, DomainPort, PortError, UserId};
use domain_claims::{CascadeSoftDelete, Claim, ClaimRepository, ClaimStatus};

use crate::error::DatabaseError;
use crate::unit_of_work::PgTx;

const SELECT_CLAIM: &str = r#"
    SELECT
        claim_id,
        vehicle_id,
        customer_id,
        description,
        status,
        total_cost,
        staff_id,
        technician_id,
        version,
        created_at,
        updated_at,
        deleted_at
    FROM claims
"#;

/// Claim status as stored in PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_status", rename_all = "snake_case")]
pub enum DbClaimStatus {
    Draft,
    Submitted,
    Reviewing,
    RequestInfo,
    Approved,
    PartiallyApproved,
    Rejected,
    Cancelled,
}

impl From<ClaimStatus> for DbClaimStatus {
    fn from(status: ClaimStatus) -> Self {
        match status {
            ClaimStatus::Draft => DbClaimStatus::Draft,
            ClaimStatus::Submitted => DbClaimStatus::Submitted,
            ClaimStatus::Reviewing => DbClaimStatus::Reviewing,
            ClaimStatus::RequestInfo => DbClaimStatus::RequestInfo,
            ClaimStatus::Approved => DbClaimStatus::Approved,
            ClaimStatus::PartiallyApproved => DbClaimStatus::PartiallyApproved,
            ClaimStatus::Rejected => DbClaimStatus::Rejected,
            ClaimStatus::Cancelled => DbClaimStatus::Cancelled,
        }
    }
}

impl From<DbClaimStatus> for ClaimStatus {
    fn from(status: DbClaimStatus) -> Self {
        match status {
            DbClaimStatus::Draft => ClaimStatus::Draft,
            DbClaimStatus::Submitted => ClaimStatus::Submitted,
            DbClaimStatus::Reviewing => ClaimStatus::Reviewing,
            DbClaimStatus::RequestInfo => ClaimStatus::RequestInfo,
            DbClaimStatus::Approved => ClaimStatus::Approved,
            DbClaimStatus::PartiallyApproved => ClaimStatus::PartiallyApproved,
            DbClaimStatus::Rejected => ClaimStatus::Rejected,
            DbClaimStatus::Cancelled => ClaimStatus::Cancelled,
        }
    }
}

/// Database row for claims
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    pub description: String,
    pub status: DbClaimStatus,
    pub total_cost: Decimal,
    pub staff_id: Uuid,
    pub technician_id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ClaimRow> for Claim {
    fn from(row: ClaimRow) -> Self {
        Claim {
            id: row.claim_id.into(),
            vehicle_id: row.vehicle_id.into(),
            customer_id: row.customer_id.into(),
            description: row.description,
            status: row.status.into(),
            total_cost: row.total_cost,
            staff_id: row.staff_id.into(),
            technician_id: row.technician_id.into(),
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// PostgreSQL-backed claim repository
#[derive(Debug, Clone)]
pub struct PostgresClaimRepository {
    pool: PgPool,
}

impl PostgresClaimRepository {
    /// Creates a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresClaimRepository {}

#[async_trait]
impl CascadeSoftDelete<PgTx> for PostgresClaimRepository {
    fn entity(&self) -> &'static str {
        "claim"
    }

    #[instrument(skip(self, tx), fields(claim_id = %claim_id))]
    async fn soft_delete_by_claim_id(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<u64, PortError> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET deleted_at = $2, updated_at = $2
            WHERE claim_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(Uuid::from(claim_id))
        .bind(Utc::now())
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ClaimRepository<PgTx> for PostgresClaimRepository {
    #[instrument(skip(self, tx, claim), fields(claim_id = %claim.id))]
    async fn insert(&self, tx: &mut PgTx, claim: &Claim) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claims (
                claim_id, vehicle_id, customer_id, description, status, total_cost,
                staff_id, technician_id, version, created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(Uuid::from(claim.id))
        .bind(Uuid::from(claim.vehicle_id))
        .bind(Uuid::from(claim.customer_id))
        .bind(&claim.description)
        .bind(DbClaimStatus::from(claim.status))
        .bind(claim.total_cost)
        .bind(Uuid::from(claim.staff_id))
        .bind(Uuid::from(claim.technician_id))
        .bind(claim.version)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .bind(claim.deleted_at)
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        debug!("Claim inserted");
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut PgTx, id: ClaimId) -> Result<Option<Claim>, PortError> {
        let row = sqlx::query_as::<_, ClaimRow>(&format!(
            "{SELECT_CLAIM} WHERE claim_id = $1 AND deleted_at IS NULL"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(Claim::from))
    }

    #[instrument(skip(self, tx, claim), fields(claim_id = %claim.id, version = claim.version))]
    async fn update(&self, tx: &mut PgTx, claim: &Claim) -> Result<Claim, PortError> {
        let row = sqlx::query_as::<_, ClaimRow>(
            r#"
            UPDATE claims
            SET description = $3,
                status = $4,
                total_cost = $5,
                updated_at = $6,
                version = version + 1
            WHERE claim_id = $1 AND version = $2 AND deleted_at IS NULL
            RETURNING
                claim_id, vehicle_id, customer_id, description, status, total_cost,
                staff_id, technician_id, version, created_at, updated_at, deleted_at
            "#,
        )
        .bind(Uuid::from(claim.id))
        .bind(claim.version)
        .bind(&claim.description)
        .bind(DbClaimStatus::from(claim.status))
        .bind(claim.total_cost)
        .bind(claim.updated_at)
        .fetch_optional(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        // Nothing matched: the claim is gone or someone bumped the version.
        let current = sqlx::query_scalar::<_, i64>(
            "SELECT version FROM claims WHERE claim_id = $1 AND deleted_at IS NULL",
        )
        .bind(Uuid::from(claim.id))
        .fetch_optional(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        match current {
            Some(found) => {
                warn!(found, "Stale claim version");
                Err(DatabaseError::StaleVersion {
                    entity: "Claim".to_string(),
                    id: claim.id.to_string(),
                    expected: claim.version,
                    found,
                }
                .into())
            }
            None => Err(DatabaseError::not_found("Claim", claim.id).into()),
        }
    }

    #[instrument(skip(self, tx), fields(claim_id = %id))]
    async fn delete(&self, tx: &mut PgTx, id: ClaimId) -> Result<(), PortError> {
        // Items, attachments and history rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM claims WHERE claim_id = $1")
            .bind(Uuid::from(id))
            .execute(&mut **tx)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", id).into());
        }
        Ok(())
    }

    async fn count_open_by_technician(&self, tx: &mut PgTx, technician_id: UserId) -> Result<u64, PortError> {
        let open: Vec<&str> = ClaimStatus::open_statuses().map(|s| s.as_str()).collect();

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM claims
            WHERE technician_id = $1
              AND deleted_at IS NULL
              AND status::text = ANY($2)
            "#,
        )
        .bind(Uuid::from(technician_id))
        .bind(open)
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(count as u64)
    }

    async fn get(&self, id: ClaimId) -> Result<Option<Claim>, PortError> {
        let row = sqlx::query_as::<_, ClaimRow>(&format!(
            "{SELECT_CLAIM} WHERE claim_id = $1 AND deleted_at IS NULL"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(Claim::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_total() {
        for status in ClaimStatus::ALL {
            assert_eq!(ClaimStatus::from(DbClaimStatus::from(status)), status);
        }
    }
}

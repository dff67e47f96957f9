//! Claim history repository implementation
//!
//! Rows are only ever inserted or soft-deleted together with their claim.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{ClaimId, DomainPort, PortError};
use domain_claims::{CascadeSoftDelete, ClaimHistory, HistoryRepository};

use super::claims::DbClaimStatus;
use crate::error::DatabaseError;
use crate::unit_of_work::PgTx;

const SELECT_HISTORY: &str = r#"
    SELECT history_id, claim_id, status, changed_by, changed_at, deleted_at
    FROM claim_histories
"#;

/// Database row for claim history entries
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub history_id: Uuid,
    pub claim_id: Uuid,
    pub status: DbClaimStatus,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<HistoryRow> for ClaimHistory {
    fn from(row: HistoryRow) -> Self {
        ClaimHistory {
            id: row.history_id.into(),
            claim_id: row.claim_id.into(),
            status: row.status.into(),
            changed_by: row.changed_by.into(),
            changed_at: row.changed_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresHistoryRepository {
    pool: PgPool,
}

impl PostgresHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresHistoryRepository {}

#[async_trait]
impl CascadeSoftDelete<PgTx> for PostgresHistoryRepository {
    fn entity(&self) -> &'static str {
        "history entry"
    }

    #[instrument(skip(self, tx), fields(claim_id = %claim_id))]
    async fn soft_delete_by_claim_id(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<u64, PortError> {
        let result = sqlx::query(
            "UPDATE claim_histories SET deleted_at = $2 WHERE claim_id = $1 AND deleted_at IS NULL",
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
impl HistoryRepository<PgTx> for PostgresHistoryRepository {
    #[instrument(skip(self, tx, entry), fields(claim_id = %entry.claim_id, status = %entry.status))]
    async fn insert(&self, tx: &mut PgTx, entry: &ClaimHistory) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claim_histories (history_id, claim_id, status, changed_by, changed_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(entry.id))
        .bind(Uuid::from(entry.claim_id))
        .bind(DbClaimStatus::from(entry.status))
        .bind(Uuid::from(entry.changed_by))
        .bind(entry.changed_at)
        .bind(entry.deleted_at)
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }

    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "{SELECT_HISTORY} WHERE claim_id = $1 AND deleted_at IS NULL ORDER BY changed_at, history_id"
        ))
        .bind(Uuid::from(claim_id))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(ClaimHistory::from).collect())
    }

    async fn latest_by_claim(&self, claim_id: ClaimId) -> Result<Option<ClaimHistory>, PortError> {
        let row = sqlx::query_as::<_, HistoryRow>(&format!(
            "{SELECT_HISTORY} WHERE claim_id = $1 AND deleted_at IS NULL \
             ORDER BY changed_at DESC, history_id DESC LIMIT 1"
        ))
        .bind(Uuid::from(claim_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(ClaimHistory::from))
    }

    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClaimHistory>, PortError> {
        let rows = sqlx::query_as::<_, HistoryRow>(&format!(
            "{SELECT_HISTORY} WHERE changed_at >= $1 AND changed_at < $2 AND deleted_at IS NULL \
             ORDER BY changed_at, history_id"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(ClaimHistory::from).collect())
    }
}

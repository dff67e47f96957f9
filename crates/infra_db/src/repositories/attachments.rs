//! Claim attachments repository implementation
//!
//! Only the attachment records live here; the files themselves belong to
//! the configured `FileStorage`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{AttachmentId, ClaimId, DomainPort, PortError};
use domain_claims::{AttachmentRepository, AttachmentType, CascadeSoftDelete, ClaimAttachment};

use crate::error::DatabaseError;
use crate::unit_of_work::PgTx;

const SELECT_ATTACHMENT: &str = r#"
    SELECT attachment_id, claim_id, attachment_type, url, created_at, deleted_at
    FROM claim_attachments
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "attachment_type", rename_all = "snake_case")]
pub enum DbAttachmentType {
    Image,
    Video,
    Other,
}

impl From<AttachmentType> for DbAttachmentType {
    fn from(attachment_type: AttachmentType) -> Self {
        match attachment_type {
            AttachmentType::Image => DbAttachmentType::Image,
            AttachmentType::Video => DbAttachmentType::Video,
            AttachmentType::Other => DbAttachmentType::Other,
        }
    }
}

impl From<DbAttachmentType> for AttachmentType {
    fn from(attachment_type: DbAttachmentType) -> Self {
        match attachment_type {
            DbAttachmentType::Image => AttachmentType::Image,
            DbAttachmentType::Video => AttachmentType::Video,
            DbAttachmentType::Other => AttachmentType::Other,
        }
    }
}

/// Database row for claim attachments
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttachmentRow {
    pub attachment_id: Uuid,
    pub claim_id: Uuid,
    pub attachment_type: DbAttachmentType,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<AttachmentRow> for ClaimAttachment {
    fn from(row: AttachmentRow) -> Self {
        ClaimAttachment {
            id: row.attachment_id.into(),
            claim_id: row.claim_id.into(),
            attachment_type: row.attachment_type.into(),
            url: row.url,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresAttachmentRepository {
    pool: PgPool,
}

impl PostgresAttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresAttachmentRepository {}

#[async_trait]
impl CascadeSoftDelete<PgTx> for PostgresAttachmentRepository {
    fn entity(&self) -> &'static str {
        "attachment"
    }

    #[instrument(skip(self, tx), fields(claim_id = %claim_id))]
    async fn soft_delete_by_claim_id(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<u64, PortError> {
        let result = sqlx::query(
            "UPDATE claim_attachments SET deleted_at = $2 WHERE claim_id = $1 AND deleted_at IS NULL",
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
impl AttachmentRepository<PgTx> for PostgresAttachmentRepository {
    #[instrument(skip(self, tx, attachment), fields(attachment_id = %attachment.id))]
    async fn insert(&self, tx: &mut PgTx, attachment: &ClaimAttachment) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claim_attachments (attachment_id, claim_id, attachment_type, url, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(attachment.id))
        .bind(Uuid::from(attachment.claim_id))
        .bind(DbAttachmentType::from(attachment.attachment_type))
        .bind(&attachment.url)
        .bind(attachment.created_at)
        .bind(attachment.deleted_at)
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, tx: &mut PgTx, id: AttachmentId) -> Result<Option<ClaimAttachment>, PortError> {
        let row = sqlx::query_as::<_, AttachmentRow>(&format!(
            "{SELECT_ATTACHMENT} WHERE attachment_id = $1 AND deleted_at IS NULL"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(ClaimAttachment::from))
    }

    #[instrument(skip(self, tx), fields(attachment_id = %id))]
    async fn delete(&self, tx: &mut PgTx, id: AttachmentId) -> Result<(), PortError> {
        let result = sqlx::query("DELETE FROM claim_attachments WHERE attachment_id = $1")
            .bind(Uuid::from(id))
            .execute(&mut **tx)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("ClaimAttachment", id).into());
        }
        Ok(())
    }

    async fn find_by_claim(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, PortError> {
        let rows = sqlx::query_as::<_, AttachmentRow>(&format!(
            "{SELECT_ATTACHMENT} WHERE claim_id = $1 AND deleted_at IS NULL ORDER BY created_at, attachment_id"
        ))
        .bind(Uuid::from(claim_id))
        .fetch_all(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(ClaimAttachment::from).collect())
    }

    async fn count_by_claim_id(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<u64, PortError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM claim_attachments WHERE claim_id = $1 AND deleted_at IS NULL",
        )
        .bind(Uuid::from(claim_id))
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(count as u64)
    }

    async fn get(&self, id: AttachmentId) -> Result<Option<ClaimAttachment>, PortError> {
        let row = sqlx::query_as::<_, AttachmentRow>(&format!(
            "{SELECT_ATTACHMENT} WHERE attachment_id = $1 AND deleted_at IS NULL"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(ClaimAttachment::from))
    }

    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, PortError> {
        let rows = sqlx::query_as::<_, AttachmentRow>(&format!(
            "{SELECT_ATTACHMENT} WHERE claim_id = $1 AND deleted_at IS NULL ORDER BY created_at, attachment_id"
        ))
        .bind(Uuid::from(claim_id))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(ClaimAttachment::from).collect())
    }
}

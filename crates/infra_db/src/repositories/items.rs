//! Claim items repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{ClaimId, ClaimItemId, DomainPort, PortError};
use domain_claims::{CascadeSoftDelete, ClaimItem, ClaimItemRepository, ItemStatus, ItemType};

use crate::error::DatabaseError;
use crate::unit_of_work::PgTx;

const SELECT_ITEM: &str = r#"
    SELECT
        item_id,
        claim_id,
        part_category_id,
        faulty_part_id,
        replacement_part_id,
        issue_description,
        status,
        item_type,
        cost,
        created_at,
        updated_at,
        deleted_at
    FROM claim_items
"#;

/// Item decision status as stored in PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_item_status", rename_all = "snake_case")]
pub enum DbItemStatus {
    Pending,
    Approved,
    Rejected,
}

/// Item type as stored in PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_item_type", rename_all = "snake_case")]
pub enum DbItemType {
    Repair,
    Replacement,
}

impl From<ItemStatus> for DbItemStatus {
    fn from(status: ItemStatus) -> Self {
        match status {
            ItemStatus::Pending => DbItemStatus::Pending,
            ItemStatus::Approved => DbItemStatus::Approved,
            ItemStatus::Rejected => DbItemStatus::Rejected,
        }
    }
}

impl From<DbItemStatus> for ItemStatus {
    fn from(status: DbItemStatus) -> Self {
        match status {
            DbItemStatus::Pending => ItemStatus::Pending,
            DbItemStatus::Approved => ItemStatus::Approved,
            DbItemStatus::Rejected => ItemStatus::Rejected,
        }
    }
}

impl From<ItemType> for DbItemType {
    fn from(item_type: ItemType) -> Self {
        match item_type {
            ItemType::Repair => DbItemType::Repair,
            ItemType::Replacement => DbItemType::Replacement,
        }
    }
}

impl From<DbItemType> for ItemType {
    fn from(item_type: DbItemType) -> Self {
        match item_type {
            DbItemType::Repair => ItemType::Repair,
            DbItemType::Replacement => ItemType::Replacement,
        }
    }
}

/// Database row for claim items
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimItemRow {
    pub item_id: Uuid,
    pub claim_id: Uuid,
    pub part_category_id: Uuid,
    pub faulty_part_id: Uuid,
    pub replacement_part_id: Option<Uuid>,
    pub issue_description: String,
    pub status: DbItemStatus,
    pub item_type: DbItemType,
    pub cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ClaimItemRow> for ClaimItem {
    fn from(row: ClaimItemRow) -> Self {
        ClaimItem {
            id: row.item_id.into(),
            claim_id: row.claim_id.into(),
            part_category_id: row.part_category_id.into(),
            faulty_part_id: row.faulty_part_id.into(),
            replacement_part_id: row.replacement_part_id.map(Into::into),
            issue_description: row.issue_description,
            status: row.status.into(),
            item_type: row.item_type.into(),
            cost: row.cost,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// PostgreSQL-backed claim item repository
#[derive(Debug, Clone)]
pub struct PostgresItemRepository {
    pool: PgPool,
}

impl PostgresItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresItemRepository {}

#[async_trait]
impl CascadeSoftDelete<PgTx> for PostgresItemRepository {
    fn entity(&self) -> &'static str {
        "claim item"
    }

    #[instrument(skip(self, tx), fields(claim_id = %claim_id))]
    async fn soft_delete_by_claim_id(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<u64, PortError> {
        let result = sqlx::query(
            r#"
            UPDATE claim_items
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
impl ClaimItemRepository<PgTx> for PostgresItemRepository {
    #[instrument(skip(self, tx, item), fields(item_id = %item.id, claim_id = %item.claim_id))]
    async fn insert(&self, tx: &mut PgTx, item: &ClaimItem) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claim_items (
                item_id, claim_id, part_category_id, faulty_part_id, replacement_part_id,
                issue_description, status, item_type, cost, created_at, updated_at, deleted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(Uuid::from(item.id))
        .bind(Uuid::from(item.claim_id))
        .bind(Uuid::from(item.part_category_id))
        .bind(Uuid::from(item.faulty_part_id))
        .bind(item.replacement_part_id.map(Uuid::from))
        .bind(&item.issue_description)
        .bind(DbItemStatus::from(item.status))
        .bind(DbItemType::from(item.item_type))
        .bind(item.cost)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.deleted_at)
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, tx: &mut PgTx, id: ClaimItemId) -> Result<Option<ClaimItem>, PortError> {
        let row = sqlx::query_as::<_, ClaimItemRow>(&format!(
            "{SELECT_ITEM} WHERE item_id = $1 AND deleted_at IS NULL"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(ClaimItem::from))
    }

    #[instrument(skip(self, tx, item), fields(item_id = %item.id))]
    async fn update(&self, tx: &mut PgTx, item: &ClaimItem) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"
            UPDATE claim_items
            SET replacement_part_id = $2,
                issue_description = $3,
                status = $4,
                item_type = $5,
                cost = $6,
                updated_at = $7
            WHERE item_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(Uuid::from(item.id))
        .bind(item.replacement_part_id.map(Uuid::from))
        .bind(&item.issue_description)
        .bind(DbItemStatus::from(item.status))
        .bind(DbItemType::from(item.item_type))
        .bind(item.cost)
        .bind(item.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("ClaimItem", item.id).into());
        }
        Ok(())
    }

    #[instrument(skip(self, tx), fields(item_id = %id))]
    async fn delete(&self, tx: &mut PgTx, id: ClaimItemId) -> Result<(), PortError> {
        let result = sqlx::query("DELETE FROM claim_items WHERE item_id = $1")
            .bind(Uuid::from(id))
            .execute(&mut **tx)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("ClaimItem", id).into());
        }
        Ok(())
    }

    async fn find_by_claim(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError> {
        let rows = sqlx::query_as::<_, ClaimItemRow>(&format!(
            "{SELECT_ITEM} WHERE claim_id = $1 AND deleted_at IS NULL ORDER BY created_at, item_id"
        ))
        .bind(Uuid::from(claim_id))
        .fetch_all(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(ClaimItem::from).collect())
    }

    async fn count_by_claim_id(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<u64, PortError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM claim_items WHERE claim_id = $1 AND deleted_at IS NULL",
        )
        .bind(Uuid::from(claim_id))
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(count as u64)
    }

    async fn sum_cost_by_claim_id(&self, tx: &mut PgTx, claim_id: ClaimId) -> Result<Decimal, PortError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(cost), 0)
            FROM claim_items
            WHERE claim_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(Uuid::from(claim_id))
        .fetch_one(&mut **tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(total)
    }

    async fn get(&self, id: ClaimItemId) -> Result<Option<ClaimItem>, PortError> {
        let row = sqlx::query_as::<_, ClaimItemRow>(&format!(
            "{SELECT_ITEM} WHERE item_id = $1 AND deleted_at IS NULL"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.map(ClaimItem::from))
    }

    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError> {
        let rows = sqlx::query_as::<_, ClaimItemRow>(&format!(
            "{SELECT_ITEM} WHERE claim_id = $1 AND deleted_at IS NULL ORDER BY created_at, item_id"
        ))
        .bind(Uuid::from(claim_id))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(rows.into_iter().map(ClaimItem::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_enum_mapping_is_total() {
        for status in ItemStatus::ALL {
            assert_eq!(ItemStatus::from(DbItemStatus::from(status)), status);
        }
        for item_type in ItemType::ALL {
            assert_eq!(ItemType::from(DbItemType::from(item_type)), item_type);
        }
    }
}

//! PostgreSQL User Directory
//!
//! Implements the claims domain's `UserDirectory` port over the `users`
//! table. The claim workflow uses it to check roles and office affiliation
//! of the staff member and technician on a claim.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresUserDirectory;
//! use domain_claims::UserDirectory;
//! use std::sync::Arc;
//!
//! let directory: Arc<dyn UserDirectory> = Arc::new(PostgresUserDirectory::new(pool));
//! let user = directory.get_user(user_id).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId,
};
use domain_claims::{User, UserDirectory, UserRole};

use crate::error::DatabaseError;

/// User role as stored in PostgreSQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum DbUserRole {
    ScStaff,
    ScTechnician,
    EvmStaff,
    Admin,
}

impl From<UserRole> for DbUserRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::ScStaff => DbUserRole::ScStaff,
            UserRole::ScTechnician => DbUserRole::ScTechnician,
            UserRole::EvmStaff => DbUserRole::EvmStaff,
            UserRole::Admin => DbUserRole::Admin,
        }
    }
}

impl From<DbUserRole> for UserRole {
    fn from(role: DbUserRole) -> Self {
        match role {
            DbUserRole::ScStaff => UserRole::ScStaff,
            DbUserRole::ScTechnician => UserRole::ScTechnician,
            DbUserRole::EvmStaff => UserRole::EvmStaff,
            DbUserRole::Admin => UserRole::Admin,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub office_id: Uuid,
    pub role: DbUserRole,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.user_id.into(),
            office_id: row.office_id.into(),
            role: row.role.into(),
        }
    }
}

/// PostgreSQL-backed implementation of the `UserDirectory` port
///
/// Database errors are translated to `PortError` variants; a missing user
/// is `PortError::NotFound`.
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers a user, replacing the office and role of an existing one
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn upsert(&self, user: &User) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, office_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET office_id = EXCLUDED.office_id, role = EXCLUDED.role
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(Uuid::from(user.office_id))
        .bind(DbUserRole::from(user.role))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(())
    }
}

impl DomainPort for PostgresUserDirectory {}

#[async_trait]
impl HealthCheckable for PostgresUserDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-user-directory".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-user-directory".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_user(&self, id: UserId) -> Result<User, PortError> {
        debug!("Fetching user by ID");

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, office_id, role FROM users WHERE user_id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| DatabaseError::not_found("User", id))?;

        Ok(row.into())
    }
}

//! Claims Domain Ports
//!
//! The claim services never talk to a database or a file store directly.
//! They depend on the traits in this module, which adapters implement:
//!
//! - **PostgreSQL adapters** in `infra_db`
//! - **Filesystem storage** in `infra_storage`
//! - **In-memory adapters** in [`crate::mock`] (feature `mock`)
//!
//! # Transactions
//!
//! Every repository write takes the transaction handle `Tx` of the
//! [`UnitOfWork`] that produced it. The services only accept a `&mut Tx`;
//! beginning, committing and rolling back belongs to the caller (see
//! [`crate::transaction::run_in_transaction`]). Read methods without a `tx`
//! argument run outside any write transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncSeek};

use core_kernel::{
    AttachmentId, ClaimId, ClaimItemId, DomainPort, OfficeId, PortError, UserId,
};

use crate::attachment::{AttachmentType, ClaimAttachment};
use crate::claim::Claim;
use crate::history::ClaimHistory;
use crate::item::ClaimItem;

/// Provider of transaction handles
///
/// Dropping a handle that was neither committed nor rolled back must discard
/// its writes.
#[async_trait]
pub trait UnitOfWork: DomainPort {
    type Tx: Send + 'static;

    async fn begin(&self) -> Result<Self::Tx, PortError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), PortError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), PortError>;
}

/// Soft-deletes every row of one entity that belongs to a claim
///
/// Implementations must be idempotent: rows already soft-deleted are left
/// alone and not counted.
#[async_trait]
pub trait CascadeSoftDelete<Tx>: DomainPort {
    /// Entity name used in logs
    fn entity(&self) -> &'static str;

    /// Returns the number of rows soft-deleted
    async fn soft_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<u64, PortError>;
}

/// Persistence of the claim aggregate root
#[async_trait]
pub trait ClaimRepository<Tx>: CascadeSoftDelete<Tx> {
    async fn insert(&self, tx: &mut Tx, claim: &Claim) -> Result<(), PortError>;

    /// Finds a claim that has not been soft-deleted
    async fn find_by_id(&self, tx: &mut Tx, id: ClaimId) -> Result<Option<Claim>, PortError>;

    /// Persists `claim` if the stored version still equals `claim.version`
    ///
    /// Returns the stored claim with its version incremented, or
    /// `PortError::Conflict` if another writer got there first.
    async fn update(&self, tx: &mut Tx, claim: &Claim) -> Result<Claim, PortError>;

    /// Permanently removes the claim together with its items, attachments
    /// and history rows
    async fn delete(&self, tx: &mut Tx, id: ClaimId) -> Result<(), PortError>;

    /// Counts the technician's claims that are not in a terminal status
    async fn count_open_by_technician(&self, tx: &mut Tx, technician_id: UserId) -> Result<u64, PortError>;

    async fn get(&self, id: ClaimId) -> Result<Option<Claim>, PortError>;
}

/// Persistence of claim items
#[async_trait]
pub trait ClaimItemRepository<Tx>: CascadeSoftDelete<Tx> {
    async fn insert(&self, tx: &mut Tx, item: &ClaimItem) -> Result<(), PortError>;

    async fn find_by_id(&self, tx: &mut Tx, id: ClaimItemId) -> Result<Option<ClaimItem>, PortError>;

    async fn update(&self, tx: &mut Tx, item: &ClaimItem) -> Result<(), PortError>;

    async fn delete(&self, tx: &mut Tx, id: ClaimItemId) -> Result<(), PortError>;

    async fn find_by_claim(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError>;

    async fn count_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<u64, PortError>;

    /// Sum of the costs of the claim's items, whatever their status
    async fn sum_cost_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Decimal, PortError>;

    async fn get(&self, id: ClaimItemId) -> Result<Option<ClaimItem>, PortError>;

    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError>;
}

/// Persistence of attachment records (not the files themselves)
#[async_trait]
pub trait AttachmentRepository<Tx>: CascadeSoftDelete<Tx> {
    async fn insert(&self, tx: &mut Tx, attachment: &ClaimAttachment) -> Result<(), PortError>;

    async fn find_by_id(&self, tx: &mut Tx, id: AttachmentId) -> Result<Option<ClaimAttachment>, PortError>;

    async fn delete(&self, tx: &mut Tx, id: AttachmentId) -> Result<(), PortError>;

    async fn find_by_claim(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, PortError>;

    async fn count_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<u64, PortError>;

    async fn get(&self, id: AttachmentId) -> Result<Option<ClaimAttachment>, PortError>;

    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, PortError>;
}

/// Append-only store of status changes
#[async_trait]
pub trait HistoryRepository<Tx>: CascadeSoftDelete<Tx> {
    async fn insert(&self, tx: &mut Tx, entry: &ClaimHistory) -> Result<(), PortError>;

    /// Oldest first
    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError>;

    async fn latest_by_claim(&self, claim_id: ClaimId) -> Result<Option<ClaimHistory>, PortError>;

    /// Entries with `from <= changed_at < to`, oldest first
    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClaimHistory>, PortError>;
}

/// Role of a user in the claim workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Service-center staff, creates and submits claims
    ScStaff,
    /// Service-center technician, diagnoses the fault
    ScTechnician,
    /// Manufacturer staff, reviews claims
    EvmStaff,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::ScStaff => "sc_staff",
            UserRole::ScTechnician => "sc_technician",
            UserRole::EvmStaff => "evm_staff",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sc_staff" => Some(UserRole::ScStaff),
            "sc_technician" => Some(UserRole::ScTechnician),
            "evm_staff" => Some(UserRole::EvmStaff),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// A user as seen by the claims domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub office_id: OfficeId,
    pub role: UserRole,
}

/// Lookup of users and their office affiliation
#[async_trait]
pub trait UserDirectory: DomainPort {
    /// Returns the user or `PortError::NotFound`
    async fn get_user(&self, id: UserId) -> Result<User, PortError>;
}

/// A rewindable byte stream being uploaded
pub trait UploadStream: AsyncRead + AsyncSeek + Unpin + Send {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send> UploadStream for T {}

/// Binary storage for attachment files
#[async_trait]
pub trait FileStorage: DomainPort {
    /// Stores the stream's bytes and returns the URL to reference them by
    async fn upload(&self, stream: &mut dyn UploadStream, category: AttachmentType) -> Result<String, PortError>;

    async fn delete_by_url(&self, url: &str) -> Result<(), PortError>;
}

/// Detects the MIME type of content from its first bytes
pub trait ContentSniffer: DomainPort {
    fn sniff(&self, head: &[u8]) -> String;
}

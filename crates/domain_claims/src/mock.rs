//! In-memory adapters for testing
//!
//! All repositories share one set of tables behind a mutex. A
//! [`MockTx`] holds that mutex for its whole lifetime and works on a staged
//! copy of the tables, which replaces the shared copy on commit and is
//! discarded on rollback or drop. Transactions are therefore fully
//! serialized, and nothing a transaction writes is visible before commit.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, AttachmentId, ClaimId, ClaimItemId, DomainPort, HealthCheckResult,
    HealthCheckable, PortError, UserId,
};

use crate::attachment::{AttachmentType, ClaimAttachment};
use crate::claim::Claim;
use crate::history::ClaimHistory;
use crate::item::ClaimItem;
use crate::ports::{
    AttachmentRepository, CascadeSoftDelete, ClaimItemRepository, ClaimRepository, FileStorage,
    HistoryRepository, UnitOfWork, UploadStream, User, UserDirectory,
};
use crate::services::ClaimStores;

/// Contents of the in-memory store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockTables {
    pub claims: HashMap<ClaimId, Claim>,
    pub items: HashMap<ClaimItemId, ClaimItem>,
    pub attachments: HashMap<AttachmentId, ClaimAttachment>,
    /// In insertion order
    pub histories: Vec<ClaimHistory>,
}

type SharedTables = Arc<Mutex<MockTables>>;

/// Named repository operations that can be made to fail
///
/// Point names are `<table>.<operation>`, e.g. `histories.insert` or
/// `attachments.soft_delete`.
#[derive(Debug, Clone, Default)]
pub struct FailPoints(Arc<StdMutex<HashSet<&'static str>>>);

impl FailPoints {
    pub fn arm(&self, point: &'static str) {
        if let Ok(mut points) = self.0.lock() {
            points.insert(point);
        }
    }

    pub fn disarm(&self, point: &'static str) {
        if let Ok(mut points) = self.0.lock() {
            points.remove(point);
        }
    }

    fn check(&self, point: &'static str) -> Result<(), PortError> {
        let armed = self
            .0
            .lock()
            .map(|points| points.contains(point))
            .unwrap_or(false);
        if armed {
            return Err(PortError::internal(format!("injected failure at {}", point)));
        }
        Ok(())
    }
}

/// Transaction handle of the in-memory store
pub struct MockTx {
    guard: OwnedMutexGuard<MockTables>,
    staged: MockTables,
}

impl MockTx {
    fn tables(&mut self) -> &mut MockTables {
        &mut self.staged
    }
}

#[derive(Debug)]
pub struct MockUnitOfWork {
    tables: SharedTables,
}

impl DomainPort for MockUnitOfWork {}

#[async_trait]
impl UnitOfWork for MockUnitOfWork {
    type Tx = MockTx;

    async fn begin(&self) -> Result<MockTx, PortError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MockTx { guard, staged })
    }

    async fn commit(&self, tx: MockTx) -> Result<(), PortError> {
        let MockTx { mut guard, staged } = tx;
        *guard = staged;
        Ok(())
    }

    async fn rollback(&self, tx: MockTx) -> Result<(), PortError> {
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl HealthCheckable for MockUnitOfWork {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "mock-unit-of-work".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: Some("Mock adapter always healthy".to_string()),
            checked_at: Utc::now(),
        }
    }
}

/// Marks the not yet deleted rows and returns how many there were
fn soft_delete_rows<'a>(markers: impl Iterator<Item = &'a mut Option<DateTime<Utc>>>) -> u64 {
    let now = Utc::now();
    let mut count = 0;
    for marker in markers {
        if marker.is_none() {
            *marker = Some(now);
            count += 1;
        }
    }
    count
}

// Claims

#[derive(Debug)]
pub struct MockClaimRepository {
    tables: SharedTables,
    fail_points: FailPoints,
}

impl DomainPort for MockClaimRepository {}

#[async_trait]
impl CascadeSoftDelete<MockTx> for MockClaimRepository {
    fn entity(&self) -> &'static str {
        "claim"
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<u64, PortError> {
        self.fail_points.check("claims.soft_delete")?;
        let rows = tx.tables().claims.values_mut().filter(|c| c.id == claim_id);
        Ok(soft_delete_rows(rows.map(|c| &mut c.deleted_at)))
    }
}

#[async_trait]
impl ClaimRepository<MockTx> for MockClaimRepository {
    async fn insert(&self, tx: &mut MockTx, claim: &Claim) -> Result<(), PortError> {
        self.fail_points.check("claims.insert")?;
        let claims = &mut tx.tables().claims;
        if claims.contains_key(&claim.id) {
            return Err(PortError::conflict(format!("claim {} already exists", claim.id)));
        }
        claims.insert(claim.id, claim.clone());
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut MockTx, id: ClaimId) -> Result<Option<Claim>, PortError> {
        Ok(tx
            .tables()
            .claims
            .get(&id)
            .filter(|c| c.deleted_at.is_none())
            .cloned())
    }

    async fn update(&self, tx: &mut MockTx, claim: &Claim) -> Result<Claim, PortError> {
        self.fail_points.check("claims.update")?;
        let stored = tx
            .tables()
            .claims
            .get_mut(&claim.id)
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| PortError::not_found("Claim", claim.id))?;

        if stored.version != claim.version {
            return Err(PortError::conflict(format!(
                "claim {} was modified concurrently (expected version {}, found {})",
                claim.id, claim.version, stored.version
            )));
        }

        let mut next = claim.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn delete(&self, tx: &mut MockTx, id: ClaimId) -> Result<(), PortError> {
        let tables = tx.tables();
        if tables.claims.remove(&id).is_none() {
            return Err(PortError::not_found("Claim", id));
        }
        tables.items.retain(|_, item| item.claim_id != id);
        tables.attachments.retain(|_, attachment| attachment.claim_id != id);
        tables.histories.retain(|entry| entry.claim_id != id);
        Ok(())
    }

    async fn count_open_by_technician(&self, tx: &mut MockTx, technician_id: UserId) -> Result<u64, PortError> {
        Ok(tx
            .tables()
            .claims
            .values()
            .filter(|c| c.technician_id == technician_id && c.deleted_at.is_none() && c.status.is_open())
            .count() as u64)
    }

    async fn get(&self, id: ClaimId) -> Result<Option<Claim>, PortError> {
        Ok(self
            .tables
            .lock()
            .await
            .claims
            .get(&id)
            .filter(|c| c.deleted_at.is_none())
            .cloned())
    }
}

// Items

#[derive(Debug)]
pub struct MockItemRepository {
    tables: SharedTables,
    fail_points: FailPoints,
}

fn items_of(tables: &MockTables, claim_id: ClaimId) -> Vec<ClaimItem> {
    let mut items: Vec<_> = tables
        .items
        .values()
        .filter(|item| item.claim_id == claim_id && item.deleted_at.is_none())
        .cloned()
        .collect();
    items.sort_by_key(|item| (item.created_at, *item.id.as_uuid()));
    items
}

impl DomainPort for MockItemRepository {}

#[async_trait]
impl CascadeSoftDelete<MockTx> for MockItemRepository {
    fn entity(&self) -> &'static str {
        "claim_item"
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<u64, PortError> {
        self.fail_points.check("items.soft_delete")?;
        let rows = tx.tables().items.values_mut().filter(|i| i.claim_id == claim_id);
        Ok(soft_delete_rows(rows.map(|i| &mut i.deleted_at)))
    }
}

#[async_trait]
impl ClaimItemRepository<MockTx> for MockItemRepository {
    async fn insert(&self, tx: &mut MockTx, item: &ClaimItem) -> Result<(), PortError> {
        self.fail_points.check("items.insert")?;
        tx.tables().items.insert(item.id, item.clone());
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut MockTx, id: ClaimItemId) -> Result<Option<ClaimItem>, PortError> {
        Ok(tx
            .tables()
            .items
            .get(&id)
            .filter(|i| i.deleted_at.is_none())
            .cloned())
    }

    async fn update(&self, tx: &mut MockTx, item: &ClaimItem) -> Result<(), PortError> {
        self.fail_points.check("items.update")?;
        let stored = tx
            .tables()
            .items
            .get_mut(&item.id)
            .filter(|i| i.deleted_at.is_none())
            .ok_or_else(|| PortError::not_found("ClaimItem", item.id))?;
        *stored = item.clone();
        Ok(())
    }

    async fn delete(&self, tx: &mut MockTx, id: ClaimItemId) -> Result<(), PortError> {
        self.fail_points.check("items.delete")?;
        tx.tables()
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("ClaimItem", id))
    }

    async fn find_by_claim(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError> {
        Ok(items_of(tx.tables(), claim_id))
    }

    async fn count_by_claim_id(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<u64, PortError> {
        Ok(items_of(tx.tables(), claim_id).len() as u64)
    }

    async fn sum_cost_by_claim_id(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<Decimal, PortError> {
        self.fail_points.check("items.sum_cost")?;
        Ok(items_of(tx.tables(), claim_id).iter().map(|item| item.cost).sum())
    }

    async fn get(&self, id: ClaimItemId) -> Result<Option<ClaimItem>, PortError> {
        Ok(self
            .tables
            .lock()
            .await
            .items
            .get(&id)
            .filter(|i| i.deleted_at.is_none())
            .cloned())
    }

    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError> {
        Ok(items_of(&*self.tables.lock().await, claim_id))
    }
}

// Attachments

#[derive(Debug)]
pub struct MockAttachmentRepository {
    tables: SharedTables,
    fail_points: FailPoints,
}

fn attachments_of(tables: &MockTables, claim_id: ClaimId) -> Vec<ClaimAttachment> {
    let mut attachments: Vec<_> = tables
        .attachments
        .values()
        .filter(|a| a.claim_id == claim_id && a.deleted_at.is_none())
        .cloned()
        .collect();
    attachments.sort_by_key(|a| (a.created_at, *a.id.as_uuid()));
    attachments
}

impl DomainPort for MockAttachmentRepository {}

#[async_trait]
impl CascadeSoftDelete<MockTx> for MockAttachmentRepository {
    fn entity(&self) -> &'static str {
        "claim_attachment"
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<u64, PortError> {
        self.fail_points.check("attachments.soft_delete")?;
        let rows = tx.tables().attachments.values_mut().filter(|a| a.claim_id == claim_id);
        Ok(soft_delete_rows(rows.map(|a| &mut a.deleted_at)))
    }
}

#[async_trait]
impl AttachmentRepository<MockTx> for MockAttachmentRepository {
    async fn insert(&self, tx: &mut MockTx, attachment: &ClaimAttachment) -> Result<(), PortError> {
        self.fail_points.check("attachments.insert")?;
        tx.tables().attachments.insert(attachment.id, attachment.clone());
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut MockTx, id: AttachmentId) -> Result<Option<ClaimAttachment>, PortError> {
        Ok(tx
            .tables()
            .attachments
            .get(&id)
            .filter(|a| a.deleted_at.is_none())
            .cloned())
    }

    async fn delete(&self, tx: &mut MockTx, id: AttachmentId) -> Result<(), PortError> {
        self.fail_points.check("attachments.delete")?;
        tx.tables()
            .attachments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("ClaimAttachment", id))
    }

    async fn find_by_claim(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, PortError> {
        Ok(attachments_of(tx.tables(), claim_id))
    }

    async fn count_by_claim_id(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<u64, PortError> {
        Ok(attachments_of(tx.tables(), claim_id).len() as u64)
    }

    async fn get(&self, id: AttachmentId) -> Result<Option<ClaimAttachment>, PortError> {
        Ok(self
            .tables
            .lock()
            .await
            .attachments
            .get(&id)
            .filter(|a| a.deleted_at.is_none())
            .cloned())
    }

    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, PortError> {
        Ok(attachments_of(&*self.tables.lock().await, claim_id))
    }
}

// History

#[derive(Debug)]
pub struct MockHistoryRepository {
    tables: SharedTables,
    fail_points: FailPoints,
}

impl DomainPort for MockHistoryRepository {}

#[async_trait]
impl CascadeSoftDelete<MockTx> for MockHistoryRepository {
    fn entity(&self) -> &'static str {
        "claim_history"
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut MockTx, claim_id: ClaimId) -> Result<u64, PortError> {
        self.fail_points.check("histories.soft_delete")?;
        let rows = tx.tables().histories.iter_mut().filter(|h| h.claim_id == claim_id);
        Ok(soft_delete_rows(rows.map(|h| &mut h.deleted_at)))
    }
}

#[async_trait]
impl HistoryRepository<MockTx> for MockHistoryRepository {
    async fn insert(&self, tx: &mut MockTx, entry: &ClaimHistory) -> Result<(), PortError> {
        self.fail_points.check("histories.insert")?;
        tx.tables().histories.push(entry.clone());
        Ok(())
    }

    async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError> {
        Ok(self
            .tables
            .lock()
            .await
            .histories
            .iter()
            .filter(|h| h.claim_id == claim_id && h.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn latest_by_claim(&self, claim_id: ClaimId) -> Result<Option<ClaimHistory>, PortError> {
        Ok(self
            .tables
            .lock()
            .await
            .histories
            .iter()
            .rev()
            .find(|h| h.claim_id == claim_id && h.deleted_at.is_none())
            .cloned())
    }

    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClaimHistory>, PortError> {
        Ok(self
            .tables
            .lock()
            .await
            .histories
            .iter()
            .filter(|h| h.deleted_at.is_none() && h.changed_at >= from && h.changed_at < to)
            .cloned()
            .collect())
    }
}

/// The whole in-memory persistence layer
pub struct MockStore {
    tables: SharedTables,
    pub fail_points: FailPoints,
    pub uow: Arc<MockUnitOfWork>,
    pub claims: Arc<MockClaimRepository>,
    pub items: Arc<MockItemRepository>,
    pub attachments: Arc<MockAttachmentRepository>,
    pub histories: Arc<MockHistoryRepository>,
}

impl MockStore {
    pub fn new() -> Self {
        let tables = SharedTables::default();
        let fail_points = FailPoints::default();

        Self {
            uow: Arc::new(MockUnitOfWork {
                tables: tables.clone(),
            }),
            claims: Arc::new(MockClaimRepository {
                tables: tables.clone(),
                fail_points: fail_points.clone(),
            }),
            items: Arc::new(MockItemRepository {
                tables: tables.clone(),
                fail_points: fail_points.clone(),
            }),
            attachments: Arc::new(MockAttachmentRepository {
                tables: tables.clone(),
                fail_points: fail_points.clone(),
            }),
            histories: Arc::new(MockHistoryRepository {
                tables: tables.clone(),
                fail_points: fail_points.clone(),
            }),
            tables,
            fail_points,
        }
    }

    pub fn stores(&self) -> ClaimStores<MockTx> {
        ClaimStores::new(
            self.claims.clone(),
            self.items.clone(),
            self.attachments.clone(),
            self.histories.clone(),
        )
    }

    /// Copy of the committed tables, including soft-deleted rows
    pub async fn snapshot(&self) -> MockTables {
        self.tables.lock().await.clone()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

/// User directory backed by a map
#[derive(Debug, Default)]
pub struct MockUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
    latency: Option<Duration>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every lookup, to exercise transaction deadlines
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn add(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

impl DomainPort for MockUserDirectory {}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn get_user(&self, id: UserId) -> Result<User, PortError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("User", id))
    }
}

/// File storage that keeps uploads in memory
#[derive(Debug, Default)]
pub struct MockFileStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
    delete_delay_ms: AtomicU64,
}

impl MockFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Makes every delete wait `delay` before touching the files
    pub fn delay_deletes(&self, delay: Duration) {
        self.delete_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.files.read().await.contains_key(url)
    }

    pub async fn read(&self, url: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(url).cloned()
    }

    pub async fn file_count(&self) -> usize {
        self.files.read().await.len()
    }
}

impl DomainPort for MockFileStorage {}

#[async_trait]
impl FileStorage for MockFileStorage {
    async fn upload(&self, stream: &mut dyn UploadStream, category: AttachmentType) -> Result<String, PortError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "mock-storage".to_string(),
            });
        }

        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| PortError::internal(e.to_string()))?;

        let url = format!("mock://{}/{}", category, Uuid::new_v4());
        self.files.write().await.insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), PortError> {
        let delay = self.delete_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "mock-storage".to_string(),
            });
        }

        self.files
            .write()
            .await
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("StoredFile", url))
    }
}

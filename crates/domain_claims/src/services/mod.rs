//! Claims domain services
//!
//! Each service works on a transaction handle supplied by its caller and
//! never begins or ends a transaction itself. [`crate::ClaimWorkflow`] wraps
//! them into transactional operations.

mod attachments;
mod audit;
mod items;
mod lifecycle;
mod workload;

pub use attachments::AttachmentManager;
pub use audit::AuditTrail;
pub use items::ItemLedger;
pub use lifecycle::ClaimLifecycle;
pub use workload::WorkloadGate;

use std::sync::Arc;

use core_kernel::ClaimId;

use crate::claim::Claim;
use crate::error::ClaimError;
use crate::ports::{
    AttachmentRepository, CascadeSoftDelete, ClaimItemRepository, ClaimRepository,
    HistoryRepository,
};

/// The repositories of the claim aggregate, sharing one transaction type
pub struct ClaimStores<Tx> {
    pub claims: Arc<dyn ClaimRepository<Tx>>,
    pub items: Arc<dyn ClaimItemRepository<Tx>>,
    pub attachments: Arc<dyn AttachmentRepository<Tx>>,
    pub histories: Arc<dyn HistoryRepository<Tx>>,
    /// Soft-delete order for a cancelled claim: children first, claim last
    pub cascade: Vec<Arc<dyn CascadeSoftDelete<Tx>>>,
}

impl<Tx: Send + 'static> ClaimStores<Tx> {
    pub fn new<C, I, A, H>(claims: Arc<C>, items: Arc<I>, attachments: Arc<A>, histories: Arc<H>) -> Self
    where
        C: ClaimRepository<Tx>,
        I: ClaimItemRepository<Tx>,
        A: AttachmentRepository<Tx>,
        H: HistoryRepository<Tx>,
    {
        let cascade = vec![
            items.clone() as Arc<dyn CascadeSoftDelete<Tx>>,
            attachments.clone() as Arc<dyn CascadeSoftDelete<Tx>>,
            histories.clone() as Arc<dyn CascadeSoftDelete<Tx>>,
            claims.clone() as Arc<dyn CascadeSoftDelete<Tx>>,
        ];

        Self {
            claims,
            items,
            attachments,
            histories,
            cascade,
        }
    }
}

impl<Tx> Clone for ClaimStores<Tx> {
    fn clone(&self) -> Self {
        Self {
            claims: Arc::clone(&self.claims),
            items: Arc::clone(&self.items),
            attachments: Arc::clone(&self.attachments),
            histories: Arc::clone(&self.histories),
            cascade: self.cascade.clone(),
        }
    }
}

/// Loads a claim that has not been soft-deleted, within `tx`
pub(crate) async fn load_claim<Tx: Send + 'static>(
    claims: &dyn ClaimRepository<Tx>,
    tx: &mut Tx,
    id: ClaimId,
) -> Result<Claim, ClaimError> {
    claims
        .find_by_id(tx, id)
        .await?
        .ok_or_else(|| ClaimError::not_found("Claim", id))
}

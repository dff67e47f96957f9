//! Audit Trail: append-only record of claim status changes

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use core_kernel::{ClaimId, UserId};

use crate::claim::ClaimStatus;
use crate::error::ClaimError;
use crate::history::ClaimHistory;
use crate::ports::HistoryRepository;

pub struct AuditTrail<Tx> {
    histories: Arc<dyn HistoryRepository<Tx>>,
}

impl<Tx: Send + 'static> AuditTrail<Tx> {
    pub fn new(histories: Arc<dyn HistoryRepository<Tx>>) -> Self {
        Self { histories }
    }

    /// Appends one history row inside `tx`
    #[instrument(skip(self, tx), fields(claim_id = %claim_id, status = %status, actor = %changed_by))]
    pub async fn record(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        status: ClaimStatus,
        changed_by: UserId,
    ) -> Result<ClaimHistory, ClaimError> {
        let entry = ClaimHistory::record(claim_id, status, changed_by);
        self.histories.insert(tx, &entry).await?;
        debug!(history_id = %entry.id, "History appended");
        Ok(entry)
    }

    /// All status changes of a claim, oldest first
    pub async fn list_by_claim(&self, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, ClaimError> {
        Ok(self.histories.list_by_claim(claim_id).await?)
    }

    pub async fn latest_by_claim(&self, claim_id: ClaimId) -> Result<Option<ClaimHistory>, ClaimError> {
        Ok(self.histories.latest_by_claim(claim_id).await?)
    }

    /// Status changes recorded in `[from, to)` across all claims
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ClaimHistory>, ClaimError> {
        if from > to {
            return Err(ClaimError::invalid_input(format!(
                "history range start {} is after its end {}",
                from, to
            )));
        }
        Ok(self.histories.list_between(from, to).await?)
    }
}

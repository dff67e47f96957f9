//! Status history of a claim

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimHistoryId, ClaimId, UserId};
use crate::claim::ClaimStatus;

/// One accepted status transition. Rows are never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimHistory {
    pub id: ClaimHistoryId,
    pub claim_id: ClaimId,
    pub status: ClaimStatus,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ClaimHistory {
    pub fn record(claim_id: ClaimId, status: ClaimStatus, changed_by: UserId) -> Self {
        Self {
            id: ClaimHistoryId::new_v7(),
            claim_id,
            status,
            changed_by,
            changed_at: Utc::now(),
            deleted_at: None,
        }
    }
}

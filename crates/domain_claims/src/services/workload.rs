//! Workload admission control for technicians

use std::sync::Arc;

use tracing::{debug, instrument};

use core_kernel::UserId;

use crate::error::ClaimError;
use crate::ports::ClaimRepository;

/// Refuses new claims for a technician who already holds the maximum number
/// of open claims
///
/// The count is re-read on every call and nothing is reserved, so the check
/// is only as strong as the isolation level of the surrounding transaction.
pub struct WorkloadGate<Tx> {
    claims: Arc<dyn ClaimRepository<Tx>>,
    max_open_claims: u32,
}

impl<Tx: Send + 'static> WorkloadGate<Tx> {
    pub fn new(claims: Arc<dyn ClaimRepository<Tx>>, max_open_claims: u32) -> Self {
        Self {
            claims,
            max_open_claims,
        }
    }

    pub fn limit(&self) -> u32 {
        self.max_open_claims
    }

    #[instrument(skip(self, tx), fields(technician_id = %technician_id))]
    pub async fn admit(&self, tx: &mut Tx, technician_id: UserId) -> Result<(), ClaimError> {
        let open_claims = self.claims.count_open_by_technician(tx, technician_id).await?;

        if open_claims >= u64::from(self.max_open_claims) {
            debug!(open_claims, limit = self.max_open_claims, "Technician at capacity");
            return Err(ClaimError::CapacityReached {
                technician_id,
                open_claims,
                limit: self.max_open_claims,
            });
        }

        Ok(())
    }
}

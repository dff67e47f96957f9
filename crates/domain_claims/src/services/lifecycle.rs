//! Claim Lifecycle Engine
//!
//! Owns the claim status state machine. Every accepted transition persists
//! the claim and appends a history row through the same transaction handle,
//! so neither write can be observed without the other.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use core_kernel::{ClaimId, UserId};

use crate::claim::{validate_description, Claim, ClaimStatus, NewClaim};
use crate::error::{ClaimError, SubmissionRequirement};
use crate::item::ItemStatus;
use crate::policy::ClaimPolicy;
use crate::ports::{UserDirectory, UserRole};
use crate::services::{load_claim, AuditTrail, ClaimStores, WorkloadGate};
use crate::transaction::{AfterCommit, Committed};

pub struct ClaimLifecycle<Tx> {
    stores: ClaimStores<Tx>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<AuditTrail<Tx>>,
    workload: WorkloadGate<Tx>,
    policy: ClaimPolicy,
}

impl<Tx: Send + 'static> ClaimLifecycle<Tx> {
    pub fn new(
        stores: ClaimStores<Tx>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<AuditTrail<Tx>>,
        policy: ClaimPolicy,
    ) -> Self {
        let workload = WorkloadGate::new(stores.claims.clone(), policy.max_claims_per_technician);
        Self {
            stores,
            users,
            audit,
            workload,
            policy,
        }
    }

    /// Opens a claim in draft for a staff member and a technician of the
    /// same office
    #[instrument(skip(self, tx, input), fields(staff_id = %input.staff_id, technician_id = %input.technician_id))]
    pub async fn create(&self, tx: &mut Tx, input: NewClaim) -> Result<Claim, ClaimError> {
        validate_description(&input.description)?;

        let staff = self.users.get_user(input.staff_id).await?;
        let technician = self.users.get_user(input.technician_id).await?;

        if staff.role != UserRole::ScStaff {
            return Err(ClaimError::invalid_input(format!(
                "user {} is {} and cannot open claims",
                staff.id,
                staff.role.as_str()
            )));
        }
        if technician.role != UserRole::ScTechnician {
            return Err(ClaimError::invalid_input(format!(
                "user {} is {} and cannot be assigned claims",
                technician.id,
                technician.role.as_str()
            )));
        }
        if staff.office_id != technician.office_id {
            return Err(ClaimError::invalid_input(format!(
                "staff {} and technician {} belong to different offices",
                staff.id, technician.id
            )));
        }

        self.workload.admit(tx, technician.id).await?;

        let claim = Claim::draft(input);
        self.stores.claims.insert(tx, &claim).await?;
        self.audit
            .record(tx, claim.id, ClaimStatus::Draft, claim.staff_id)
            .await?;

        info!(claim_id = %claim.id, "Claim created");
        Ok(claim)
    }

    #[instrument(skip(self, tx, description), fields(claim_id = %id))]
    pub async fn update(&self, tx: &mut Tx, id: ClaimId, description: String) -> Result<Claim, ClaimError> {
        let mut claim = load_claim(self.stores.claims.as_ref(), tx, id).await?;
        claim.ensure_status(ClaimStatus::Draft, "update")?;
        claim.set_description(description)?;

        let claim = self.stores.claims.update(tx, &claim).await?;
        info!("Claim updated");
        Ok(claim)
    }

    /// Permanently removes a draft claim with its children
    ///
    /// The stored files of its attachments are removed after commit.
    #[instrument(skip(self, tx), fields(claim_id = %id))]
    pub async fn hard_delete(&self, tx: &mut Tx, id: ClaimId) -> Result<Committed<()>, ClaimError> {
        let claim = load_claim(self.stores.claims.as_ref(), tx, id).await?;
        claim.ensure_status(ClaimStatus::Draft, "delete")?;

        let attachments = self.stores.attachments.find_by_claim(tx, id).await?;
        self.stores.claims.delete(tx, id).await?;

        let mut after_commit = AfterCommit::new();
        for attachment in attachments {
            after_commit.delete_remote_file(attachment.url);
        }

        info!(stored_files = after_commit.tasks().len(), "Claim deleted");
        Ok(Committed::with_tasks((), after_commit))
    }

    /// Soft-deletes a cancelled claim and everything it owns
    #[instrument(skip(self, tx), fields(claim_id = %id))]
    pub async fn soft_delete(&self, tx: &mut Tx, id: ClaimId) -> Result<(), ClaimError> {
        let claim = load_claim(self.stores.claims.as_ref(), tx, id).await?;
        claim.ensure_status(ClaimStatus::Cancelled, "soft-delete")?;

        for store in &self.stores.cascade {
            let rows = store.soft_delete_by_claim_id(tx, id).await?;
            debug!(entity = store.entity(), rows, "Soft-deleted");
        }

        info!("Claim soft-deleted");
        Ok(())
    }

    /// Moves a claim to `status` if the transition table allows it
    #[instrument(skip(self, tx), fields(claim_id = %id, actor = %actor))]
    pub async fn update_status(
        &self,
        tx: &mut Tx,
        id: ClaimId,
        status: ClaimStatus,
        actor: UserId,
    ) -> Result<Claim, ClaimError> {
        let claim = load_claim(self.stores.claims.as_ref(), tx, id).await?;
        self.apply_transition(tx, claim, status, actor).await
    }

    /// Sends a claim to the manufacturer once it has enough items and
    /// attachments
    #[instrument(skip(self, tx), fields(claim_id = %id, actor = %actor))]
    pub async fn submit(&self, tx: &mut Tx, id: ClaimId, actor: UserId) -> Result<Claim, ClaimError> {
        let claim = load_claim(self.stores.claims.as_ref(), tx, id).await?;
        if !claim.status.can_transition_to(ClaimStatus::Submitted) {
            return Err(ClaimError::InvalidStatusTransition {
                from: claim.status,
                to: ClaimStatus::Submitted,
            });
        }

        let items = self.stores.items.count_by_claim_id(tx, id).await?;
        if items < u64::from(self.policy.min_items_per_claim) {
            return Err(ClaimError::MissingInformation {
                claim_id: id,
                requirement: SubmissionRequirement::Items,
                actual: items,
                minimum: self.policy.min_items_per_claim,
            });
        }

        let attachments = self.stores.attachments.count_by_claim_id(tx, id).await?;
        if attachments < u64::from(self.policy.min_attachments_per_claim) {
            return Err(ClaimError::MissingInformation {
                claim_id: id,
                requirement: SubmissionRequirement::Attachments,
                actual: attachments,
                minimum: self.policy.min_attachments_per_claim,
            });
        }

        self.apply_transition(tx, claim, ClaimStatus::Submitted, actor).await
    }

    /// Closes a reviewed claim with the outcome derived from its items
    #[instrument(skip(self, tx), fields(claim_id = %id, actor = %actor))]
    pub async fn complete(&self, tx: &mut Tx, id: ClaimId, actor: UserId) -> Result<Claim, ClaimError> {
        let claim = load_claim(self.stores.claims.as_ref(), tx, id).await?;
        let items = self.stores.items.find_by_claim(tx, id).await?;

        if items.is_empty() {
            return Err(ClaimError::invalid_input(format!("claim {} has no items to decide", id)));
        }
        if items.iter().any(|item| !item.status.is_decided()) {
            return Err(ClaimError::invalid_input("all items must be decided"));
        }

        let approved = items
            .iter()
            .filter(|item| item.status == ItemStatus::Approved)
            .count();
        let outcome = if approved == items.len() {
            ClaimStatus::Approved
        } else if approved == 0 {
            ClaimStatus::Rejected
        } else {
            ClaimStatus::PartiallyApproved
        };

        self.apply_transition(tx, claim, outcome, actor).await
    }

    pub async fn get(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        self.stores
            .claims
            .get(id)
            .await?
            .ok_or_else(|| ClaimError::not_found("Claim", id))
    }

    async fn apply_transition(
        &self,
        tx: &mut Tx,
        mut claim: Claim,
        next: ClaimStatus,
        actor: UserId,
    ) -> Result<Claim, ClaimError> {
        let from = claim.status;
        if let Err(error) = claim.transition_to(next) {
            debug!(from = %from, to = %next, "Transition refused");
            return Err(error);
        }

        let claim = self.stores.claims.update(tx, &claim).await?;
        self.audit.record(tx, claim.id, next, actor).await?;

        info!(from = %from, to = %next, "Claim status changed");
        Ok(claim)
    }
}

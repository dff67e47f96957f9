//! Claim aggregate and its status state machine

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, CustomerId, UserId, VehicleId};
use crate::error::ClaimError;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    /// Being prepared by the service center
    Draft,
    /// Sent to the manufacturer
    Submitted,
    /// Under manufacturer review
    Reviewing,
    /// Manufacturer asked the service center for more information
    RequestInfo,
    /// Every item approved
    Approved,
    /// Some items approved, some rejected
    PartiallyApproved,
    /// No item approved
    Rejected,
    /// Withdrawn before a decision
    Cancelled,
}

use ClaimStatus::*;

/// Allowed transitions, keyed by current status. Statuses without an entry
/// are terminal.
const TRANSITIONS: &[(ClaimStatus, &[ClaimStatus])] = &[
    (Draft, &[Submitted, Cancelled]),
    (Submitted, &[Reviewing, Cancelled]),
    (Reviewing, &[RequestInfo, Approved, PartiallyApproved, Rejected]),
    (RequestInfo, &[Submitted, Cancelled]),
];

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 8] = [
        Draft,
        Submitted,
        Reviewing,
        RequestInfo,
        Approved,
        PartiallyApproved,
        Rejected,
        Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Draft => "draft",
            Submitted => "submitted",
            Reviewing => "reviewing",
            RequestInfo => "request_info",
            Approved => "approved",
            PartiallyApproved => "partially_approved",
            Rejected => "rejected",
            Cancelled => "cancelled",
        }
    }

    /// Statuses reachable from this one in a single step
    pub fn allowed_transitions(&self) -> &'static [ClaimStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| from == self)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(&self, next: ClaimStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Open claims count against a technician's workload
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn open_statuses() -> impl Iterator<Item = ClaimStatus> {
        Self::ALL.into_iter().filter(|s| s.is_open())
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ClaimError::invalid_input(format!("unknown claim status '{}'", s)))
    }
}

/// Data required to open a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub vehicle_id: VehicleId,
    pub customer_id: CustomerId,
    pub staff_id: UserId,
    pub technician_id: UserId,
    pub description: String,
}

/// A warranty claim raised by a service center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub vehicle_id: VehicleId,
    pub customer_id: CustomerId,
    pub description: String,
    pub status: ClaimStatus,
    /// Sum of the costs of the claim's items
    pub total_cost: Decimal,
    /// Staff member who created the claim
    pub staff_id: UserId,
    /// Technician assigned to the claim
    pub technician_id: UserId,
    /// Incremented on every persisted update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Claim {
    /// Creates a new claim in draft
    pub fn draft(input: NewClaim) -> Self {
        let now = Utc::now();
        Self {
            id: ClaimId::new_v7(),
            vehicle_id: input.vehicle_id,
            customer_id: input.customer_id,
            description: input.description,
            status: ClaimStatus::Draft,
            total_cost: Decimal::ZERO,
            staff_id: input.staff_id,
            technician_id: input.technician_id,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Moves the claim to `next` if the transition table allows it
    pub fn transition_to(&mut self, next: ClaimStatus) -> Result<(), ClaimError> {
        if !self.status.can_transition_to(next) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Fails with an invalid-action error unless the claim is in `required`
    pub fn ensure_status(&self, required: ClaimStatus, action: &str) -> Result<(), ClaimError> {
        if self.status != required {
            return Err(ClaimError::invalid_action(format!(
                "cannot {} claim {} in status {}; claim must be {}",
                action, self.id, self.status, required
            )));
        }
        Ok(())
    }

    pub fn set_description(&mut self, description: String) -> Result<(), ClaimError> {
        validate_description(&description)?;
        self.description = description;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_total_cost(&mut self, total_cost: Decimal) {
        self.total_cost = total_cost;
        self.updated_at = Utc::now();
    }
}

pub(crate) fn validate_description(description: &str) -> Result<(), ClaimError> {
    if description.trim().is_empty() {
        return Err(ClaimError::invalid_input("claim description must not be empty"));
    }
    Ok(())
}

//! Claims domain errors

use std::fmt;

use thiserror::Error;

use core_kernel::{ClaimId, PortError, UserId};

use crate::claim::ClaimStatus;

/// Stable classification of a [`ClaimError`], suitable for mapping onto
/// transport status codes by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InvalidAction,
    MissingInformation,
    Capacity,
    Conflict,
    Storage,
    Persistence,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidAction => "invalid_action",
            ErrorKind::MissingInformation => "missing_information",
            ErrorKind::Capacity => "capacity",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Storage => "storage_error",
            ErrorKind::Persistence => "persistence_error",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum that a claim must meet before it can be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionRequirement {
    Items,
    Attachments,
}

impl fmt::Display for SubmissionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionRequirement::Items => f.write_str("items"),
            SubmissionRequirement::Attachments => f.write_str("attachments"),
        }
    }
}

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: ClaimStatus, to: ClaimStatus },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Missing information: claim {claim_id} has {actual} {requirement}, at least {minimum} required")]
    MissingInformation {
        claim_id: ClaimId,
        requirement: SubmissionRequirement,
        actual: u64,
        minimum: u32,
    },

    #[error("Technician {technician_id} already has {open_claims} open claims (limit {limit})")]
    CapacityReached {
        technician_id: UserId,
        open_claims: u64,
        limit: u32,
    },

    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Persistence error: {0}")]
    Persistence(#[source] PortError),

    #[error("Transaction deadline of {timeout_ms}ms exceeded")]
    DeadlineExceeded { timeout_ms: u64 },
}

impl ClaimError {
    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        ClaimError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ClaimError::InvalidInput(message.into())
    }

    pub fn invalid_action(message: impl Into<String>) -> Self {
        ClaimError::InvalidAction(message.into())
    }

    /// Wraps a failure reported by the file storage collaborator
    pub fn storage(error: impl fmt::Display) -> Self {
        ClaimError::Storage(error.to_string())
    }

    /// Returns the stable kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClaimError::NotFound { .. } => ErrorKind::NotFound,
            ClaimError::InvalidInput(_) => ErrorKind::InvalidInput,
            ClaimError::InvalidStatusTransition { .. } | ClaimError::InvalidAction(_) => {
                ErrorKind::InvalidAction
            }
            ClaimError::MissingInformation { .. } => ErrorKind::MissingInformation,
            ClaimError::CapacityReached { .. } => ErrorKind::Capacity,
            ClaimError::Conflict(_) => ErrorKind::Conflict,
            ClaimError::Storage(_) => ErrorKind::Storage,
            ClaimError::Persistence(_) => ErrorKind::Persistence,
            ClaimError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
        }
    }
}

impl From<PortError> for ClaimError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => ClaimError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, .. } => ClaimError::InvalidInput(message),
            PortError::Conflict { message } => ClaimError::Conflict(message),
            other => ClaimError::Persistence(other),
        }
    }
}

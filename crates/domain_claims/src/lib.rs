//! EV Warranty Claims Domain
//!
//! This crate implements the lifecycle of a warranty claim raised by a
//! service center against the vehicle manufacturer: drafting the claim,
//! attaching evidence, listing the faulty parts, review, and the final
//! decision.
//!
//! # Claim Lifecycle
//!
//! ```text
//! draft -> submitted -> reviewing -> approved | partially_approved | rejected
//!   |          |            |
//!   |          |            +-> request_info -> submitted | cancelled
//!   +----------+-> cancelled
//! ```
//!
//! Every mutating operation runs in one unit of work supplied by the
//! [`UnitOfWork`] port; [`ClaimWorkflow`] is the transactional entry point.

pub mod attachment;
pub mod claim;
pub mod error;
pub mod history;
pub mod item;
pub mod policy;
pub mod ports;
pub mod services;
pub mod sniff;
pub mod transaction;
pub mod workflow;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use attachment::{AttachmentType, ClaimAttachment};
pub use claim::{Claim, ClaimStatus, NewClaim};
pub use error::{ClaimError, ErrorKind, SubmissionRequirement};
pub use history::ClaimHistory;
pub use item::{ClaimItem, ClaimItemUpdate, ItemStatus, ItemType, NewClaimItem};
pub use policy::ClaimPolicy;
pub use ports::{
    AttachmentRepository, CascadeSoftDelete, ClaimItemRepository, ClaimRepository,
    ContentSniffer, FileStorage, HistoryRepository, UnitOfWork, UploadStream, User,
    UserDirectory, UserRole,
};
pub use services::ClaimStores;
pub use sniff::SignatureSniffer;
pub use transaction::{run_in_transaction, AfterCommit, BestEffortTask, Committed};
pub use workflow::{ClaimWorkflow, Collaborators};

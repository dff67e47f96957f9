//! Core Kernel - Foundational types for the warranty claims system
//!
//! This crate provides the building blocks shared by the domain and
//! infrastructure crates:
//! - Strongly typed identifiers for claims, their children and the actors involved
//! - The port error type and marker traits for the ports and adapters layout

pub mod identifiers;
pub mod ports;

pub use identifiers::{
    ClaimId, ClaimItemId, AttachmentId, ClaimHistoryId,
    UserId, OfficeId, VehicleId, CustomerId, PartCategoryId, PartId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};

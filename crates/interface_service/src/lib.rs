//! Warranty Claims Service Wiring
//!
//! Turns a [`config::ServiceConfig`] into a running set of adapters:
//!
//! - `config`: environment-driven configuration (`CLAIMS__*`)
//! - `telemetry`: tracing subscriber installation
//! - `bootstrap`: PostgreSQL pool, filesystem storage and the claim workflow
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_service::{init_tracing, ServiceConfig, ServiceContext};
//!
//! dotenvy::dotenv().ok();
//! let config = ServiceConfig::from_env()?;
//! init_tracing(&config.log_level, config.log_json)?;
//! let service = ServiceContext::bootstrap(&config).await?;
//! let claim = service.workflow.get_claim(claim_id).await?;
//! ```

pub mod config;
pub mod telemetry;
pub mod bootstrap;

pub use config::ServiceConfig;
pub use telemetry::init_tracing;
pub use bootstrap::{all_healthy, BootstrapError, PgClaimWorkflow, ServiceContext};

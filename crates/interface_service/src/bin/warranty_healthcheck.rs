//! Probes the claims database and attachment storage
//!
//! Exits non-zero if any adapter is unhealthy, so it can serve as a
//! container health check.
//!
//! # Usage
//!
//! ```bash
//! CLAIMS__DATABASE_URL=postgres://... CLAIMS__STORAGE_ROOT=/data cargo run --bin warranty-healthcheck
//! ```

use anyhow::{bail, Context};
use tracing::info;

use interface_service::{all_healthy, init_tracing, ServiceConfig, ServiceContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_env().context("invalid CLAIMS__* configuration")?;
    init_tracing(&config.log_level, config.log_json)?;

    let service = ServiceContext::bootstrap(&config).await?;
    let report = service.health_report().await;

    for result in &report {
        info!(
            adapter = %result.adapter_id,
            status = ?result.status,
            latency_ms = result.latency_ms,
            "Health check"
        );
    }

    if !all_healthy(&report) {
        bail!("one or more adapters are unhealthy");
    }
    Ok(())
}

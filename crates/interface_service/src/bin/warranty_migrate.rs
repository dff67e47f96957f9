//! Applies the warranty claims schema migrations
//!
//! # Usage
//!
//! ```bash
//! CLAIMS__DATABASE_URL=postgres://... cargo run --bin warranty-migrate
//! ```

use anyhow::Context;
use tracing::info;

use infra_db::{create_pool, run_migrations};
use interface_service::{init_tracing, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_env().context("invalid CLAIMS__* configuration")?;
    init_tracing(&config.log_level, config.log_json)?;

    let pool = create_pool(config.database())
        .await
        .context("cannot connect to the claims database")?;
    run_migrations(&pool).await?;

    info!("Schema is up to date");
    Ok(())
}

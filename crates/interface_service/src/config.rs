//! Service configuration
//!
//! Loaded from environment variables prefixed `CLAIMS`, with `__` separating
//! nested keys:
//!
//! ```text
//! CLAIMS__DATABASE_URL=postgres://warranty:secret@db/warranty
//! CLAIMS__STORAGE_ROOT=/var/lib/warranty/attachments
//! CLAIMS__TRANSACTION_TIMEOUT_MS=5000
//! CLAIMS__POLICY__MAX_CLAIMS_PER_TECHNICIAN=12
//! ```
//!
//! Unset keys keep their defaults.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use domain_claims::ClaimPolicy;
use infra_db::{DatabaseConfig, IsolationLevel};

const ENV_PREFIX: &str = "CLAIMS";
const ENV_SEPARATOR: &str = "__";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    /// Recycle pooled connections after this long; 0 keeps them forever
    pub max_lifetime_secs: u64,
    /// Close connections idle for this long; 0 keeps them open
    pub idle_timeout_secs: u64,
    /// Run every unit of work at SERIALIZABLE isolation
    pub serializable_transactions: bool,
    /// Deadline for a single unit of work; none when unset
    pub transaction_timeout_ms: Option<u64>,
    /// Directory attachment files are written to
    pub storage_root: PathBuf,
    /// Prefix of the URLs handed out for stored files
    pub storage_base_url: String,
    pub max_upload_bytes: Option<u64>,
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    pub policy: ClaimPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/warranty".to_string(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
            max_lifetime_secs: 30 * 60,
            idle_timeout_secs: 10 * 60,
            serializable_transactions: true,
            transaction_timeout_ms: None,
            storage_root: PathBuf::from("./data/attachments"),
            storage_base_url: "file:///attachments".to_string(),
            max_upload_bytes: Some(50 * 1024 * 1024),
            log_level: "info".to_string(),
            log_json: false,
            policy: ClaimPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Self::environment())
    }

    /// Loads configuration from an explicit set of `CLAIMS__*` variables
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(Self::environment().source(Some(vars)))
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Message("database_url must not be empty".to_string()));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Message(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.storage_base_url.trim().is_empty() {
            return Err(ConfigError::Message("storage_base_url must not be empty".to_string()));
        }
        if self.policy.max_claims_per_technician == 0 {
            return Err(ConfigError::Message(
                "policy.max_claims_per_technician must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pool settings derived from this configuration
    pub fn database(&self) -> DatabaseConfig {
        let seconds = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            acquire_timeout: Duration::from_secs(self.connect_timeout_secs),
            max_lifetime: seconds(self.max_lifetime_secs),
            idle_timeout: seconds(self.idle_timeout_secs),
        }
    }

    pub fn isolation(&self) -> IsolationLevel {
        if self.serializable_transactions {
            IsolationLevel::Serializable
        } else {
            IsolationLevel::ReadCommitted
        }
    }

    pub fn transaction_timeout(&self) -> Option<Duration> {
        self.transaction_timeout_ms.map(Duration::from_millis)
    }
}

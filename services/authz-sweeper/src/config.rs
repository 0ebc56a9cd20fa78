//! Configuration for the expiry sweeper: the same layered
//! `config`+`dotenvy`+`AUTHZ__`-prefixed-environment idiom
//! `services/authz-server` uses, trimmed to the keys this service
//! actually reads (`holdExpiryHours` isn't one of them - the sweeper
//! only reads hold expiry timestamps already stamped by the server).
//!
//! `externals.ledger` mirrors `services/authz-server`'s setting of the
//! same name key-for-key (`AUTHZ__EXTERNALS__LEDGER__BASE_URL`, etc.) -
//! pointing both processes at the same value is what makes them share
//! one ledger instance rather than each holding its own.

use authz_core::RetryConfig;
use authz_db::DbConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub sweep: SweepSettings,
    #[serde(default)]
    pub externals: ExternalsSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalsSettings {
    #[serde(default)]
    pub ledger: ExternalServiceSettings,
}

impl Default for ExternalsSettings {
    fn default() -> Self {
        Self { ledger: ExternalServiceSettings::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalServiceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for ExternalServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            retry: RetrySettings::default(),
        }
    }
}

impl ExternalServiceSettings {
    pub fn call_budget(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(r: &RetrySettings) -> Self {
        RetryConfig {
            max_attempts: r.max_attempts,
            initial_backoff: Duration::from_millis(r.backoff_ms),
            max_backoff: Duration::from_secs(5),
        }
    }
}

fn default_base_url() -> String {
    String::new()
}
fn default_timeout_seconds() -> u64 {
    5
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

impl From<&DatabaseSettings> for DbConfig {
    fn from(s: &DatabaseSettings) -> Self {
        DbConfig {
            url: s.url.clone(),
            max_connections: s.max_connections,
            min_connections: s.min_connections,
            acquire_timeout_secs: s.acquire_timeout_secs,
        }
    }
}

/// `sweep.intervalSeconds`: how often the sweeper polls for expired
/// holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SweepSettings {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_db_url() -> String {
    "postgresql://localhost/authz".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_acquire_timeout() -> u64 {
    10
}
fn default_interval() -> u64 {
    3600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            sweep: SweepSettings::default(),
            externals: ExternalsSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SweeperConfig {
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("AUTHZ").separator("__").try_parsing(true));

        let config = builder.build()?;
        let sweeper_config: SweeperConfig = config.try_deserialize().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "using default configuration - could not deserialize layered config");
            SweeperConfig::default()
        });
        Ok(sweeper_config)
    }
}

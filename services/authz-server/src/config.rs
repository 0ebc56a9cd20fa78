//! Layered configuration for the authorization HTTP server: a config
//! file (optional) overlaid with `AUTHZ__`-prefixed environment
//! variables, built on the `config`/`dotenvy` stack. Every tunable the
//! service reads at runtime has a field here, alongside the ambient
//! server concerns (bind address, logging, shutdown).

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use authz_core::retry::RetryConfig;
use authz_db::DbConfig;
use authz_holds::HoldsConfig;
use authz_limits::LimitsConfig;
use authz_risk::RiskConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub hold_expiry_hours: HoldExpiry,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub defaults: DefaultLimits,
    #[serde(default)]
    pub channel_multipliers: ChannelMultipliers,
    #[serde(default)]
    pub high_risk: HighRiskSettings,
    #[serde(default)]
    pub sweep: SweepSettings,
    #[serde(default)]
    pub externals: ExternalsSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().expect("invalid socket address")
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
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
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            run_migrations: true,
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

/// `holdExpiryHours`: TTL applied at hold creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HoldExpiry {
    #[serde(default = "default_hold_expiry_hours")]
    pub hours: i64,
}

impl Default for HoldExpiry {
    fn default() -> Self {
        Self {
            hours: default_hold_expiry_hours(),
        }
    }
}

impl From<HoldExpiry> for HoldsConfig {
    fn from(h: HoldExpiry) -> Self {
        HoldsConfig {
            hold_ttl: chrono::Duration::hours(h.hours),
        }
    }
}

/// `challengeThreshold`, `declineThreshold`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSettings {
    #[serde(default = "default_challenge_threshold")]
    pub challenge_threshold: u8,
    #[serde(default = "default_decline_threshold")]
    pub decline_threshold: u8,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            challenge_threshold: default_challenge_threshold(),
            decline_threshold: default_decline_threshold(),
        }
    }
}

/// `defaults.{transactionLimit,dailyLimit,monthlyLimit,atmDailyLimit,
/// contactlessLimit,onlineLimit}`: the fallback limit tier used when a
/// card carries no override, card-level, or product-code tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultLimits {
    #[serde(default = "default_transaction_limit")]
    pub transaction_limit: Decimal,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: Decimal,
    #[serde(default = "default_monthly_limit")]
    pub monthly_limit: Decimal,
    #[serde(default = "default_atm_daily_limit")]
    pub atm_daily_limit: Decimal,
    #[serde(default = "default_contactless_limit")]
    pub contactless_limit: Decimal,
    #[serde(default = "default_online_limit")]
    pub online_limit: Decimal,
}

impl Default for DefaultLimits {
    fn default() -> Self {
        Self {
            transaction_limit: default_transaction_limit(),
            daily_limit: default_daily_limit(),
            monthly_limit: default_monthly_limit(),
            atm_daily_limit: default_atm_daily_limit(),
            contactless_limit: default_contactless_limit(),
            online_limit: default_online_limit(),
        }
    }
}

impl DefaultLimits {
    /// Builds the lowest-priority tier in a card's effective-limit chain,
    /// in `currency` (the account's settlement currency).
    pub fn as_tier(&self, currency: authz_types::Currency) -> authz_types::LimitTier {
        use authz_types::Money;
        authz_types::LimitTier {
            scope: authz_types::LimitScope::Default,
            transaction_limit: Money::new(self.transaction_limit, currency),
            daily_limit: Money::new(self.daily_limit, currency),
            monthly_limit: Money::new(self.monthly_limit, currency),
            atm_daily_limit: Some(Money::new(self.atm_daily_limit, currency)),
            contactless_limit: Some(Money::new(self.contactless_limit, currency)),
            online_limit: Some(Money::new(self.online_limit, currency)),
        }
    }
}

/// `channelMultipliers.{atm,ecommerce,pos}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMultipliers {
    #[serde(default = "default_atm_multiplier")]
    pub atm: Decimal,
    #[serde(default = "default_ecommerce_multiplier")]
    pub ecommerce: Decimal,
    #[serde(default = "default_pos_multiplier")]
    pub pos: Decimal,
}

impl Default for ChannelMultipliers {
    fn default() -> Self {
        Self {
            atm: default_atm_multiplier(),
            ecommerce: default_ecommerce_multiplier(),
            pos: default_pos_multiplier(),
        }
    }
}

impl From<&ChannelMultipliers> for LimitsConfig {
    fn from(c: &ChannelMultipliers) -> Self {
        LimitsConfig::new(c.atm, c.ecommerce, c.pos)
    }
}

/// `highRisk.{countries,mccs}`. `countries` is carried for
/// configuration-surface completeness; the risk engine's
/// `unusual_country` rule compares against the card's own issuer
/// country rather than a configured set, so it is not consumed by
/// `RiskEngine` today.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighRiskSettings {
    #[serde(default)]
    pub countries: HashSet<String>,
    #[serde(default = "default_high_risk_mccs")]
    pub mccs: HashSet<String>,
}

impl RiskSettings {
    pub fn to_risk_config(&self, high_risk: &HighRiskSettings) -> RiskConfig {
        RiskConfig {
            decline_threshold: self.decline_threshold,
            challenge_threshold: self.challenge_threshold,
            high_risk_mccs: high_risk.mccs.clone(),
            ..RiskConfig::default()
        }
    }
}

/// `sweep.intervalSeconds`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SweepSettings {
    #[serde(default = "default_sweep_interval")]
    pub interval_seconds: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_sweep_interval(),
        }
    }
}

/// `externals.{cardService,ledger,notification}.{baseUrl, timeoutSeconds,
/// retry.{maxAttempts, backoffMs}}`. The card directory and
/// notification services are still in-memory collaborators, so their
/// `base_url` is unused today. `externals.ledger.base_url` is live:
/// both `authz-server` and
/// `authz-sweeper` build an `HttpLedgerClient` from it, so the two
/// processes move funds against one shared ledger instead of two
/// disconnected in-memory maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalsSettings {
    #[serde(default)]
    pub card_service: ExternalServiceSettings,
    #[serde(default)]
    pub ledger: ExternalServiceSettings,
    #[serde(default)]
    pub notification: ExternalServiceSettings,
}

impl Default for ExternalsSettings {
    fn default() -> Self {
        Self {
            card_service: ExternalServiceSettings::default(),
            ledger: ExternalServiceSettings::default(),
            notification: ExternalServiceSettings::default(),
        }
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

// =============================================================================
// Default value functions (config's serde defaults need free functions)
// =============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_shutdown_timeout() -> u64 {
    30
}
fn default_db_url() -> String {
    "postgresql://localhost/authz".to_string()
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_acquire_timeout() -> u64 {
    10
}
fn default_true() -> bool {
    true
}
fn default_hold_expiry_hours() -> i64 {
    24 * 7
}
fn default_challenge_threshold() -> u8 {
    70
}
fn default_decline_threshold() -> u8 {
    90
}
fn default_transaction_limit() -> Decimal {
    Decimal::new(500_00, 2)
}
fn default_daily_limit() -> Decimal {
    Decimal::new(2_000_00, 2)
}
fn default_monthly_limit() -> Decimal {
    Decimal::new(10_000_00, 2)
}
fn default_atm_daily_limit() -> Decimal {
    Decimal::new(500_00, 2)
}
fn default_contactless_limit() -> Decimal {
    Decimal::new(100_00, 2)
}
fn default_online_limit() -> Decimal {
    Decimal::new(1_000_00, 2)
}
fn default_atm_multiplier() -> Decimal {
    Decimal::new(5, 1)
}
fn default_ecommerce_multiplier() -> Decimal {
    Decimal::new(75, 2)
}
fn default_pos_multiplier() -> Decimal {
    Decimal::ONE
}
fn default_high_risk_mccs() -> HashSet<String> {
    ["7995", "5993", "5921", "7273", "7994", "5816", "5967"].into_iter().map(String::from).collect()
}
fn default_sweep_interval() -> u64 {
    3600
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
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

// =============================================================================
// Loading
// =============================================================================

impl ServerConfig {
    /// Layered load: optional config file, then `config/default.{toml,...}`
    /// and `config/local.*` if present, then `AUTHZ__`-prefixed environment
    /// variables (double underscore separated, e.g.
    /// `AUTHZ__SERVER__PORT=9090`).
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
        let server_config: ServerConfig = config.try_deserialize().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "using default configuration - could not deserialize layered config");
            ServerConfig::default()
        });
        Ok(server_config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseSettings::default(),
            hold_expiry_hours: HoldExpiry::default(),
            risk: RiskSettings::default(),
            defaults: DefaultLimits::default(),
            channel_multipliers: ChannelMultipliers::default(),
            high_risk: HighRiskSettings::default(),
            sweep: SweepSettings::default(),
            externals: ExternalsSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_into_domain_configs() {
        let config = ServerConfig::default();
        let db: DbConfig = (&config.database).into();
        assert_eq!(db.max_connections, 20);

        let holds: HoldsConfig = config.hold_expiry_hours.into();
        assert_eq!(holds.hold_ttl, chrono::Duration::hours(24 * 7));

        let limits: LimitsConfig = (&config.channel_multipliers).into();
        assert_eq!(limits.factor_for(authz_types::Channel::Atm), Decimal::new(5, 1));

        let risk = config.risk.to_risk_config(&config.high_risk);
        assert_eq!(risk.challenge_threshold, 70);
        assert_eq!(risk.decline_threshold, 90);
    }

    #[test]
    fn socket_addr_parses_host_and_port() {
        let settings = ServerSettings::default();
        assert_eq!(settings.socket_addr().port(), 8080);
    }
}

//! Expiry Sweeper (C13): a background process that periodically expires
//! authorization holds past their `expiresAt`, releasing each one's
//! reserved funds back to the account. Every hold in a sweep batch is
//! expired independently so one failure never blocks the rest.

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use authz_core::{Clock, SystemClock};
use authz_db::Database;
use authz_holds::HoldManager;
use authz_ledger::HttpLedgerClient;

use crate::config::SweeperConfig;

#[derive(Parser, Debug)]
#[command(name = "authz-sweeper")]
#[command(author, version, about = "Expires authorization holds past their TTL", long_about = None)]
struct Args {
    /// Path to a configuration file (TOML, JSON, or YAML).
    #[arg(short, long, env = "AUTHZ_CONFIG")]
    config: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Sweep interval in seconds.
    #[arg(long, env = "AUTHZ_SWEEP_INTERVAL_SECONDS")]
    interval_seconds: Option<u64>,

    /// Run a single sweep pass and exit instead of looping.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut sweeper_config = SweeperConfig::load(args.config.as_deref())?;
    if let Some(database_url) = args.database_url {
        sweeper_config.database.url = database_url;
    }
    if let Some(interval) = args.interval_seconds {
        sweeper_config.sweep.interval_seconds = interval;
    }

    init_logging(&sweeper_config.logging)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting expiry sweeper");

    let db_config = (&sweeper_config.database).into();
    let db = Database::connect(&db_config).await?;

    // The sweeper only ever releases a hold's reserved funds, the same
    // ledger move `HoldManager::expire_one` already performs against
    // whatever ledger backs the account. It talks to the ledger over the
    // same `externals.ledger.base_url` `services/authz-server` is
    // configured with, so the release lands against the account the
    // server actually reserved on, not an empty process-local mock.
    let ledger: Arc<dyn authz_ledger::Ledger> = Arc::new(HttpLedgerClient::new(
        &sweeper_config.externals.ledger.base_url,
        sweeper_config.externals.ledger.call_budget(),
        (&sweeper_config.externals.ledger.retry).into(),
    ));
    let hold_store: Arc<dyn authz_holds::HoldStore> = Arc::new(db.hold_store());
    let holds = HoldManager::new(hold_store, ledger, authz_holds::HoldsConfig::default());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if args.once {
        run_sweep(&holds, clock.as_ref()).await;
        return Ok(());
    }

    let interval = Duration::from_secs(sweeper_config.sweep.interval_seconds);
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_sweep(&holds, clock.as_ref()).await;
            }
            _ = shutdown_signal() => {
                tracing::info!("expiry sweeper shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Runs one sweep pass, logging each hold's outcome independently so a
/// single failed release doesn't hide the rest. Takes `now` from the
/// injected [`Clock`] rather than calling `Utc::now()`
/// directly so a test can substitute `authz_core::clock::test_util::FixedClock`
/// and assert exactly which holds a given instant sweeps.
async fn run_sweep(holds: &HoldManager, clock: &dyn Clock) {
    let now = clock.now();
    match holds.sweep_expired(now).await {
        Ok(results) => {
            let total = results.len();
            let mut failed = 0;
            for (hold_id, outcome) in results {
                match outcome {
                    Ok(()) => {
                        tracing::info!(%hold_id, "hold expired");
                    }
                    Err(err) => {
                        failed += 1;
                        tracing::warn!(%hold_id, error = %err, "failed to expire hold, will retry next sweep");
                    }
                }
            }
            tracing::info!(total, failed, "sweep pass complete");
        }
        Err(err) => {
            tracing::error!(error = %err, "sweep pass failed to list expired holds");
        }
    }
}

fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber.with(fmt::layer().pretty().with_target(true)).init();
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_core::clock::test_util::FixedClock;
    use authz_holds::InMemoryHoldStore;
    use authz_ledger::InMemoryLedger;
    use authz_types::{AccountId, CardId, Currency, DecisionId, MerchantId, Money, RequestId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn cli_parses_interval_override() {
        let args = Args::parse_from(["authz-sweeper", "--interval-seconds", "120"]);
        assert_eq!(args.interval_seconds, Some(120));
    }

    #[test]
    fn cli_defaults_to_looping() {
        let args = Args::parse_from(["authz-sweeper"]);
        assert!(!args.once);
    }

    #[tokio::test]
    async fn run_sweep_uses_the_injected_clock_rather_than_wall_time() {
        let ledger = Arc::new(InMemoryLedger::new());
        let account_id = AccountId::new();
        ledger.seed(account_id, Money::new(dec!(100.00), Currency::USD)).await;
        let store = Arc::new(InMemoryHoldStore::new());
        let holds = HoldManager::new(store, ledger.clone() as Arc<dyn authz_ledger::Ledger>, authz_holds::HoldsConfig::default());

        let created_at = Utc::now() - chrono::Duration::days(30);
        let hold = holds
            .create(
                RequestId::new(),
                DecisionId::new(),
                account_id,
                None,
                CardId::new(),
                MerchantId::new(),
                "Acme".to_string(),
                Money::new(dec!(100.00), Currency::USD),
                None,
                "123456".to_string(),
                created_at,
            )
            .await
            .unwrap();

        // A clock still behind the hold's expiry sweeps nothing.
        let before_expiry = FixedClock::new(created_at + chrono::Duration::hours(1));
        run_sweep(&holds, &before_expiry).await;
        assert_eq!(holds.get(hold.hold_id).await.unwrap().status, authz_types::HoldStatus::Active);

        // Advancing the same clock past the TTL is what drives the sweep,
        // not wall-clock time passing.
        before_expiry.advance(chrono::Duration::days(8));
        run_sweep(&holds, &before_expiry).await;
        assert_eq!(holds.get(hold.hold_id).await.unwrap().status, authz_types::HoldStatus::Expired);
    }
}

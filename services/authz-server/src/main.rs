//! Authorization server: the HTTP binary that wires the orchestrator, its
//! Postgres-backed stores, and the card directory/ledger/fx collaborators
//! into `authz-api`'s router and serves it with graceful shutdown.
//!
//! The card directory, ledger, and FX provider are external contracts.
//! The ledger is reached over HTTP at `externals.ledger`'s configured
//! `base_url`: `services/authz-sweeper` runs as a separate process
//! against the same endpoint, so the two binaries move funds against
//! one shared backing ledger rather than two disjoint in-memory ones.
//! The card directory and FX provider remain in-memory mocks behind the
//! same trait-object seam.

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use authz_api::{create_router, AppState};
use authz_card_directory::InMemoryCardDirectory;
use authz_db::Database;
use authz_fx::mock::StaticFxProvider;
use authz_holds::HoldManager;
use authz_ledger::HttpLedgerClient;
use authz_orchestrator::AuthorizationOrchestrator;

use crate::config::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "authz-server")]
#[command(author, version, about = "Card authorization decision service", long_about = None)]
struct Args {
    /// Path to a configuration file (TOML, JSON, or YAML).
    #[arg(short, long, env = "AUTHZ_CONFIG")]
    config: Option<String>,

    /// Host to bind to.
    #[arg(long, env = "AUTHZ_HOST")]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "AUTHZ_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "AUTHZ_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty).
    #[arg(long, env = "AUTHZ_LOG_FORMAT")]
    log_format: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Skip running migrations on startup.
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(database_url) = args.database_url {
        server_config.database.url = database_url;
    }
    if let Some(level) = args.log_level {
        server_config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        server_config.logging.format = format;
    }
    if args.skip_migrations {
        server_config.database.run_migrations = false;
    }

    init_logging(&server_config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting authorization server");

    let state = build_state(&server_config).await?;
    let app = create_router(state);

    let addr = server_config.server.socket_addr();
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Connects to Postgres, runs migrations, and wires every orchestrator
/// collaborator into an [`AppState`]. The card directory and FX provider
/// start as empty, in-memory mocks; the ledger is a real HTTP client
/// against `externals.ledger.base_url`, the same endpoint
/// `services/authz-sweeper` is configured with, so both processes move
/// funds against one shared ledger instead of two disconnected ones.
async fn build_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let db_config = (&config.database).into();
    let db = Database::connect(&db_config).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let card_directory: Arc<dyn authz_card_directory::CardDirectory> = Arc::new(InMemoryCardDirectory::new());
    let ledger: Arc<dyn authz_ledger::Ledger> = Arc::new(HttpLedgerClient::new(
        &config.externals.ledger.base_url,
        config.externals.ledger.call_budget(),
        (&config.externals.ledger.retry).into(),
    ));
    let fx: Arc<dyn authz_fx::Fx> = Arc::new(StaticFxProvider::new());

    let requests: Arc<dyn authz_db::repos::RequestStore> = Arc::new(db.request_repo());
    let decisions: Arc<dyn authz_db::repos::DecisionStore> = Arc::new(db.decision_repo());
    let spending_windows: Arc<dyn authz_limits::SpendingWindowStore> = Arc::new(db.spending_window_store());
    let hold_store: Arc<dyn authz_holds::HoldStore> = Arc::new(db.hold_store());

    let limits_config = (&config.channel_multipliers).into();
    let risk_config = config.risk.to_risk_config(&config.high_risk);
    let holds_config: authz_holds::HoldsConfig = config.hold_expiry_hours.into();

    let orchestrator = Arc::new(AuthorizationOrchestrator::new(
        card_directory.clone(),
        ledger.clone(),
        fx,
        spending_windows,
        hold_store.clone(),
        requests.clone(),
        decisions.clone(),
        limits_config,
        risk_config,
        holds_config.clone(),
        authz_orchestrator::OrchestratorConfig::default(),
    ));

    let holds = Arc::new(HoldManager::new(hold_store, ledger, holds_config));

    Ok(Arc::new(AppState::new(orchestrator, holds, requests, decisions, card_directory)))
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

async fn shutdown_signal(timeout: Duration) {
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
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        }
    }

    tracing::info!(timeout_secs = timeout.as_secs(), "waiting for in-flight requests to complete");
    tokio::time::sleep(timeout).await;
}

//! authz-db - PostgreSQL persistence for requests, decisions, holds, and
//! spending windows (C4-C6). No Redis tier: there is no session cache or
//! rate limiter in this domain, so the connection surface is Postgres
//! only.

pub mod config;
pub mod error;
pub mod models;
pub mod repos;

pub use config::DbConfig;
pub use error::{DbError, DbResult};
pub use repos::*;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub struct Database {
    pub pg: PgPool,
}

impl Database {
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        info!(url = %config.url_masked(), "connecting to PostgreSQL");
        let pg = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        info!("connected to PostgreSQL");
        Ok(Self { pg })
    }

    pub async fn migrate(&self) -> DbResult<()> {
        info!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pg)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;
        info!("migrations complete");
        Ok(())
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pg).await.is_ok()
    }

    pub fn request_repo(&self) -> RequestRepo {
        RequestRepo::new(self.pg.clone())
    }

    pub fn decision_repo(&self) -> DecisionRepo {
        DecisionRepo::new(self.pg.clone())
    }

    pub fn hold_store(&self) -> PgHoldStore {
        PgHoldStore::new(self.pg.clone())
    }

    pub fn spending_window_store(&self) -> PgSpendingWindowStore {
        PgSpendingWindowStore::new(self.pg.clone())
    }
}

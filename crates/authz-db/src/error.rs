//! Database error types. No Redis variant - there is no cache tier here,
//! just Postgres.

use authz_core::failure::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl Classify for DbError {
    fn kind(&self) -> FailureKind {
        match self {
            DbError::NotFound(_) => FailureKind::NotFound,
            DbError::Serialization(_) => FailureKind::Internal,
            DbError::Migration(_) => FailureKind::Internal,
            DbError::Connection(_) => FailureKind::TransientUpstream,
            DbError::Query(_) => FailureKind::TransientUpstream,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

//! authz-card-directory - the card directory contract (C1).
//!
//! Resolves a panHash or token to [`CardDetails`]: status, expiry, issuer
//! country, 3DS enrollment, and the effective-limit tier chain. This
//! crate defines the trait the orchestrator depends on plus an
//! in-memory mock implementation; a production deployment would swap in
//! a client that calls the real card directory service without the
//! orchestrator noticing.

pub mod error;
pub mod mock;

pub use error::CardDirectoryError;
pub use mock::InMemoryCardDirectory;

use async_trait::async_trait;
use authz_types::CardDetails;

#[async_trait]
pub trait CardDirectory: Send + Sync {
    async fn lookup_by_pan_hash(&self, pan_hash: &str) -> Result<CardDetails, CardDirectoryError>;
    async fn lookup_by_token(&self, token: &str) -> Result<CardDetails, CardDirectoryError>;
}

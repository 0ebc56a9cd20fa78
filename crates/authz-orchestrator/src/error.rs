//! The orchestrator's own failure surface. Every evaluator's typed error
//! is consulted inline while walking the pipeline - most of them resolve
//! to a persisted DECLINED decision, not an `Err` here; what lands in
//! [`OrchestratorError`] is what's left over: requests/decisions/holds
//! that don't exist, operations invalid for the current state, and
//! anything transient or internal bubbling up from a collaborator.

use authz_core::failure::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("request is malformed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("operation not valid for the current state: {0}")]
    InvalidState(String),

    #[error("challenge window has already expired")]
    ChallengeExpired,

    #[error("upstream collaborator unavailable: {0}")]
    TransientUpstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> FailureKind {
        match self {
            OrchestratorError::Validation(_) => FailureKind::Validation,
            OrchestratorError::NotFound(_) => FailureKind::NotFound,
            OrchestratorError::InvalidState(_) | OrchestratorError::ChallengeExpired => FailureKind::InvalidState,
            OrchestratorError::TransientUpstream(_) => FailureKind::TransientUpstream,
            OrchestratorError::Internal(_) => FailureKind::Internal,
        }
    }
}

impl Classify for OrchestratorError {
    fn kind(&self) -> FailureKind {
        self.kind()
    }
}

/// Folds any collaborator error that reached this far (i.e. was not
/// already resolved into a DECLINED decision by the pipeline) into an
/// [`OrchestratorError`] using its own [`Classify::kind`]. A
/// `BusinessDecline` reaching here is itself a bug - every call site that
/// can produce one handles it before this is ever invoked - so it is
/// folded into `Internal` rather than silently swallowed.
pub fn propagate<E: Classify + std::fmt::Display>(err: E) -> OrchestratorError {
    let kind = err.kind();
    let message = err.to_string();
    match kind {
        FailureKind::Validation => OrchestratorError::Validation(message),
        FailureKind::NotFound => OrchestratorError::NotFound(message),
        FailureKind::InvalidState => OrchestratorError::InvalidState(message),
        FailureKind::TransientUpstream => OrchestratorError::TransientUpstream(message),
        FailureKind::BusinessDecline | FailureKind::Internal => OrchestratorError::Internal(message),
    }
}

impl From<authz_db::DbError> for OrchestratorError {
    fn from(e: authz_db::DbError) -> Self {
        propagate(e)
    }
}

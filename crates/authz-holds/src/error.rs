use authz_core::failure::{Classify, FailureKind};
use authz_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum HoldsError {
    #[error("hold not found")]
    NotFound,
    #[error("hold is not in ACTIVE state")]
    InvalidState,
    #[error("capture amount must be in (0, hold.amount]")]
    InvalidAmount,
    #[error("ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("hold store unavailable: {0}")]
    Store(String),
}

impl HoldsError {
    pub fn kind(&self) -> FailureKind {
        match self {
            HoldsError::NotFound => FailureKind::NotFound,
            HoldsError::InvalidState => FailureKind::InvalidState,
            HoldsError::InvalidAmount => FailureKind::Validation,
            HoldsError::Ledger(e) => e.kind(),
            HoldsError::Store(_) => FailureKind::TransientUpstream,
        }
    }
}

impl Classify for HoldsError {
    fn kind(&self) -> FailureKind {
        self.kind()
    }
}

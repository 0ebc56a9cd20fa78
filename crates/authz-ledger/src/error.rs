use authz_core::failure::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("insufficient available balance: have {available}, need {required}")]
    InsufficientAvailable { available: String, required: String },

    #[error("reserved amount underflow releasing/posting against account {0}")]
    ReservedUnderflow(String),

    #[error("currency mismatch")]
    CurrencyMismatch,

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LedgerError::AccountNotFound(_) => FailureKind::NotFound,
            LedgerError::InsufficientAvailable { .. } => FailureKind::BusinessDecline,
            LedgerError::ReservedUnderflow(_) => FailureKind::InvalidState,
            LedgerError::CurrencyMismatch => FailureKind::Validation,
            LedgerError::Unavailable(_) => FailureKind::TransientUpstream,
        }
    }
}

impl Classify for LedgerError {
    fn kind(&self) -> FailureKind {
        self.kind()
    }
}

use authz_core::failure::{Classify, FailureKind};
use authz_fx::FxError;
use authz_ledger::LedgerError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum BalanceError {
    #[error("ledger lookup failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("fx rate lookup failed: {0}")]
    Fx(#[from] FxError),
    #[error("no available balance: have {available}, need {required}")]
    InsufficientFunds { available: Decimal, required: Decimal },
}

impl BalanceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            BalanceError::Ledger(e) => e.kind(),
            BalanceError::Fx(e) => e.kind(),
            BalanceError::InsufficientFunds { .. } => FailureKind::BusinessDecline,
        }
    }
}

impl Classify for BalanceError {
    fn kind(&self) -> FailureKind {
        self.kind()
    }
}

use authz_core::failure::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LimitsError {
    #[error("amount exceeds the channel-adjusted single-transaction limit")]
    ExceedsTransactionLimit,
    #[error("amount exceeds the ATM withdrawal limit")]
    ExceedsWithdrawalLimit,
    #[error("amount exceeds the contactless per-transaction cap")]
    ExceedsContactlessLimit,
    #[error("amount exceeds the e-commerce online cap")]
    ExceedsOnlineLimit,
    #[error("amount would exceed the daily spending limit")]
    ExceedsDailyLimit,
    #[error("amount would exceed the monthly spending limit")]
    ExceedsMonthlyLimit,
    #[error("card has no effective limit tier configured")]
    NoLimitTier,
    #[error("spending window store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LimitsError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LimitsError::StoreUnavailable(_) => FailureKind::TransientUpstream,
            LimitsError::NoLimitTier => FailureKind::Internal,
            _ => FailureKind::BusinessDecline,
        }
    }
}

impl Classify for LimitsError {
    fn kind(&self) -> FailureKind {
        self.kind()
    }
}

use authz_core::failure::{Classify, FailureKind};
use authz_types::Currency;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum FxError {
    #[error("no rate available for {from}/{to}")]
    PairUnavailable { from: Currency, to: Currency },
    #[error("fx provider unavailable: {0}")]
    Unavailable(String),
}

impl FxError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FxError::PairUnavailable { .. } => FailureKind::NotFound,
            FxError::Unavailable(_) => FailureKind::TransientUpstream,
        }
    }
}

impl Classify for FxError {
    fn kind(&self) -> FailureKind {
        self.kind()
    }
}

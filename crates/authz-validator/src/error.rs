use authz_card_directory::CardDirectoryError;
use authz_core::failure::{Classify, FailureKind};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ValidatorError {
    #[error("request carries neither a panHash nor a token")]
    MissingCardReference,
    #[error("card directory lookup failed: {0}")]
    Directory(#[from] CardDirectoryError),
    #[error("card has expired")]
    ExpiredCard,
    #[error("card is not active")]
    CardNotActive,
    #[error("card reported lost or stolen")]
    CardLostStolen,
}

impl ValidatorError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ValidatorError::MissingCardReference => FailureKind::Validation,
            ValidatorError::Directory(e) => e.kind(),
            ValidatorError::ExpiredCard
            | ValidatorError::CardNotActive
            | ValidatorError::CardLostStolen => FailureKind::BusinessDecline,
        }
    }
}

impl Classify for ValidatorError {
    fn kind(&self) -> FailureKind {
        self.kind()
    }
}

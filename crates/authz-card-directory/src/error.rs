use authz_core::FailureKind;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CardDirectoryError {
    #[error("no card found for the given reference")]
    CardNotFound,

    #[error("card directory unavailable: {0}")]
    Unavailable(String),
}

impl CardDirectoryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CardDirectoryError::CardNotFound => FailureKind::NotFound,
            CardDirectoryError::Unavailable(_) => FailureKind::TransientUpstream,
        }
    }
}

impl authz_core::failure::Classify for CardDirectoryError {
    fn kind(&self) -> FailureKind {
        self.kind()
    }
}

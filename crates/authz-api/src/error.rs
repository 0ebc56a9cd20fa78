//! The API's own error surface: a thin `IntoResponse` wrapper over
//! [`authz_core::failure::FailureKind`].

use authz_core::failure::{Classify, FailureKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("operation not valid for the current state: {0}")]
    Conflict(String),

    #[error("upstream collaborator unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Internal(_) | ApiError::ServiceUnavailable(_)) {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({ "error": true, "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// Folds any component error that reached the API layer (i.e. was not
/// already resolved by the orchestrator into a persisted decision) onto
/// an `ApiError` via its `FailureKind`. A `BusinessDecline` here would be
/// an orchestrator bug - every decline path is supposed to come back as
/// an `Ok(AuthorizationDecision)` - so it maps to `Internal` rather than
/// being silently swallowed.
pub fn classify<E: Classify + std::fmt::Display>(err: E) -> ApiError {
    let message = err.to_string();
    match err.kind() {
        FailureKind::Validation => ApiError::BadRequest(message),
        FailureKind::NotFound => ApiError::NotFound(message),
        FailureKind::InvalidState => ApiError::Conflict(message),
        FailureKind::TransientUpstream => ApiError::ServiceUnavailable(message),
        FailureKind::BusinessDecline | FailureKind::Internal => ApiError::Internal(message),
    }
}

impl From<authz_orchestrator::OrchestratorError> for ApiError {
    fn from(e: authz_orchestrator::OrchestratorError) -> Self {
        classify(e)
    }
}

impl From<authz_db::DbError> for ApiError {
    fn from(e: authz_db::DbError) -> Self {
        classify(e)
    }
}

impl From<authz_holds::HoldsError> for ApiError {
    fn from(e: authz_holds::HoldsError) -> Self {
        classify(e)
    }
}

impl From<authz_card_directory::CardDirectoryError> for ApiError {
    fn from(e: authz_card_directory::CardDirectoryError) -> Self {
        classify(e)
    }
}

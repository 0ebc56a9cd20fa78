//! Handlers for `/api/v1/authorizations/*`.

use crate::dto::{
    decision_status_code, AuthorizationDecisionDto, ChallengeCompleteRequest, CreateAuthorizationRequest,
    ReverseAuthorizationRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use authz_types::{CardDetails, DecisionId, RequestId};
use chrono::Utc;
use std::sync::Arc;

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

pub async fn create_authorization(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateAuthorizationRequest>,
) -> ApiResult<(StatusCode, Json<AuthorizationDecisionDto>)> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let request = body.into_domain(Utc::now())?;
    let decision = state
        .orchestrator
        .authorize(request, idempotency_key.as_deref())
        .await?;

    Ok((decision_status_code(&decision), Json(AuthorizationDecisionDto::from(&decision))))
}

pub async fn get_decision(
    State(state): State<Arc<AppState>>,
    Path(decision_id): Path<i64>,
) -> ApiResult<Json<AuthorizationDecisionDto>> {
    let decision = state
        .decisions
        .find_by_id(DecisionId::from(decision_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("decision {decision_id}")))?;
    Ok(Json(AuthorizationDecisionDto::from(&decision)))
}

pub async fn get_decision_by_request(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
) -> ApiResult<Json<AuthorizationDecisionDto>> {
    let decision = state
        .decisions
        .find_by_request_id(RequestId::from(request_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("decision for request {request_id}")))?;
    Ok(Json(AuthorizationDecisionDto::from(&decision)))
}

/// Re-fetches the card referenced by `request_id`'s original request,
/// bypassing `CardValidator`'s status/expiry checks: a reversal or
/// challenge-completion must be able to proceed even if the card has
/// since expired or been blocked, since it is unwinding or finishing an
/// authorization that already happened against it.
async fn resolve_card(state: &AppState, request_id: RequestId) -> ApiResult<(authz_types::AuthorizationRequest, CardDetails)> {
    let request = state
        .requests
        .find_by_id(request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("request {request_id}")))?;

    let card = if let Some(pan_hash) = &request.pan_hash {
        state.card_directory.lookup_by_pan_hash(pan_hash).await?
    } else if let Some(token) = &request.token {
        state.card_directory.lookup_by_token(token).await?
    } else {
        return Err(ApiError::Internal(format!("request {request_id} has no card reference")));
    };
    Ok((request, card))
}

pub async fn reverse_authorization(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
    Json(body): Json<ReverseAuthorizationRequest>,
) -> ApiResult<Json<AuthorizationDecisionDto>> {
    let request_id = RequestId::from(request_id);
    let (request, card) = resolve_card(&state, request_id).await?;
    let decision = state
        .orchestrator
        .reverse_authorization(request_id, &card, request.channel, &body.reason, Utc::now())
        .await?;
    Ok(Json(AuthorizationDecisionDto::from(&decision)))
}

pub async fn challenge_complete(
    State(state): State<Arc<AppState>>,
    Path(request_id): Path<i64>,
    Json(body): Json<ChallengeCompleteRequest>,
) -> ApiResult<Json<AuthorizationDecisionDto>> {
    let request_id = RequestId::from(request_id);
    let (_request, card) = resolve_card(&state, request_id).await?;
    let decision = state
        .orchestrator
        .challenge_complete(request_id, card, &body.challenge_result, Utc::now())
        .await?;
    Ok(Json(AuthorizationDecisionDto::from(&decision)))
}

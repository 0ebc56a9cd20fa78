//! Handlers for `/api/v1/holds/*`.

use crate::dto::{AuthorizationHoldDto, CaptureHoldRequest, ListHoldsQuery, ReleaseHoldRequest};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use authz_types::{AccountId, HoldId, Money};
use chrono::Utc;
use std::sync::Arc;

pub async fn get_hold(
    State(state): State<Arc<AppState>>,
    Path(hold_id): Path<i64>,
) -> ApiResult<Json<AuthorizationHoldDto>> {
    let hold = state.holds.get(HoldId::from(hold_id)).await?;
    Ok(Json(AuthorizationHoldDto::from(&hold)))
}

pub async fn capture_hold(
    State(state): State<Arc<AppState>>,
    Path(hold_id): Path<i64>,
    Json(body): Json<CaptureHoldRequest>,
) -> ApiResult<Json<AuthorizationHoldDto>> {
    let amount = Money::new(body.amount, body.currency);
    let hold = state
        .holds
        .capture(HoldId::from(hold_id), amount, body.reference.as_deref(), Utc::now())
        .await?;
    Ok(Json(AuthorizationHoldDto::from(&hold)))
}

pub async fn release_hold(
    State(state): State<Arc<AppState>>,
    Path(hold_id): Path<i64>,
    Json(_body): Json<ReleaseHoldRequest>,
) -> ApiResult<Json<AuthorizationHoldDto>> {
    let hold = state.holds.release(HoldId::from(hold_id), None, Utc::now()).await?;
    Ok(Json(AuthorizationHoldDto::from(&hold)))
}

pub async fn list_holds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListHoldsQuery>,
) -> ApiResult<Json<Vec<AuthorizationHoldDto>>> {
    let holds = state
        .holds
        .list_by_account(AccountId::from(query.account_id), query.status)
        .await?;
    Ok(Json(holds.iter().map(AuthorizationHoldDto::from).collect()))
}

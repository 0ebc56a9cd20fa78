//! `AuthorizationDecision` wire shape, returned by every authorization
//! endpoint.

use authz_types::{AuthorizationDecision, BalanceSnapshot, Decision, DecisionPathEntry, LimitsSnapshot, Money};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPathEntryDto {
    pub component: String,
    pub outcome: String,
    pub reason_code: Option<String>,
    pub at: DateTime<Utc>,
    pub hash: String,
}

impl From<&DecisionPathEntry> for DecisionPathEntryDto {
    fn from(e: &DecisionPathEntry) -> Self {
        Self {
            component: e.component.clone(),
            outcome: e.outcome.clone(),
            reason_code: e.reason_code.map(|r| r.code().to_string()),
            at: e.at,
            hash: e.hash.clone(),
        }
    }
}

/// The response body for every authorization endpoint. `reasonCode` is
/// surfaced as its two-digit wire code, not the internal enum variant
/// name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecisionDto {
    pub decision_id: i64,
    pub request_id: i64,
    pub decision: Decision,
    pub reason_code: String,
    pub reason_message: String,
    pub approved_amount: Money,
    pub authorization_code: Option<String>,
    pub risk_score: Option<u8>,
    pub hold_id: Option<i64>,
    pub limits_snapshot: Option<LimitsSnapshot>,
    pub balance_snapshot: Option<BalanceSnapshot>,
    pub decision_path: Vec<DecisionPathEntryDto>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&AuthorizationDecision> for AuthorizationDecisionDto {
    fn from(d: &AuthorizationDecision) -> Self {
        Self {
            decision_id: d.decision_id.value(),
            request_id: d.request_id.value(),
            decision: d.decision,
            reason_code: d.reason_code.code().to_string(),
            reason_message: d.reason_message.clone(),
            approved_amount: d.approved_amount,
            authorization_code: d.authorization_code.clone(),
            risk_score: d.risk_score,
            hold_id: d.hold_id.map(|h| h.value()),
            limits_snapshot: d.limits_snapshot.clone(),
            balance_snapshot: d.balance_snapshot.clone(),
            decision_path: d.decision_path.iter().map(DecisionPathEntryDto::from).collect(),
            created_at: d.created_at,
            expires_at: d.expires_at,
        }
    }
}

/// HTTP status a decision resolves to at the authorization endpoints:
/// APPROVED/PARTIAL -> 200, CHALLENGE -> 202, DECLINED -> 422.
pub fn decision_status_code(decision: &AuthorizationDecision) -> axum::http::StatusCode {
    use axum::http::StatusCode;
    match decision.decision {
        Decision::Approved | Decision::Partial => StatusCode::OK,
        Decision::Challenge => StatusCode::ACCEPTED,
        Decision::Declined => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

//! Hold wire DTOs, backing the `/api/v1/holds/*` surface.

use authz_types::{AuthorizationHold, Currency, HoldStatus, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationHoldDto {
    pub hold_id: i64,
    pub request_id: i64,
    pub decision_id: i64,
    pub account_id: i64,
    pub account_space_id: Option<i64>,
    pub card_id: i64,
    pub merchant_id: i64,
    pub merchant_name: String,
    pub amount: Money,
    pub authorization_code: String,
    pub status: HoldStatus,
    pub captured_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl From<&AuthorizationHold> for AuthorizationHoldDto {
    fn from(h: &AuthorizationHold) -> Self {
        Self {
            hold_id: h.hold_id.value(),
            request_id: h.request_id.value(),
            decision_id: h.decision_id.value(),
            account_id: h.account_id.value(),
            account_space_id: h.account_space_id.map(|a| a.value()),
            card_id: h.card_id.value(),
            merchant_id: h.merchant_id.value(),
            merchant_name: h.merchant_name.clone(),
            amount: h.amount,
            authorization_code: h.authorization_code.clone(),
            status: h.status,
            captured_amount: h.captured_amount,
            created_at: h.created_at,
            updated_at: h.updated_at,
            captured_at: h.captured_at,
            expires_at: h.expires_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureHoldRequest {
    pub amount: rust_decimal::Decimal,
    pub currency: Currency,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseHoldRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListHoldsQuery {
    pub account_id: i64,
    pub status: Option<HoldStatus>,
}

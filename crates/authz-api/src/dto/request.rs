//! `AuthorizationRequest` wire shape for `POST /api/v1/authorizations`.

use crate::error::ApiError;
use authz_types::{AuthorizationRequest, Channel, Money, RequestId, ThreeDsData, TransactionType};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDsDataDto {
    pub eci: Option<String>,
    pub cavv: Option<String>,
    pub xid: Option<String>,
}

impl From<ThreeDsDataDto> for ThreeDsData {
    fn from(dto: ThreeDsDataDto) -> Self {
        ThreeDsData {
            eci: dto.eci,
            cavv: dto.cavv,
            xid: dto.xid,
        }
    }
}

/// The request body of `POST /api/v1/authorizations`. `requestId` is
/// optional - callers that don't supply one get one minted on intake;
/// callers relying on idempotency instead send the `Idempotency-Key`
/// header and omit both `requestId` and a prior call's correlation
/// entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthorizationRequest {
    pub masked_pan: String,
    pub pan_hash: Option<String>,
    pub token: Option<String>,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub merchant_id: i64,
    pub merchant_name: String,
    pub channel: Channel,
    pub mcc: String,
    pub country_code: String,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub cryptogram: Option<String>,
    pub pin_data: Option<String>,
    pub three_ds: Option<ThreeDsDataDto>,
}

impl CreateAuthorizationRequest {
    /// Validates the request is well-formed and turns it into the domain
    /// type, minting a fresh `requestId` and `timestamp`. Mirrors
    /// `AuthorizationRequest::has_card_reference`/the amount-positive
    /// invariant; anything violating either is a `FORMAT_ERROR`-class
    /// 400, not a pipeline decline.
    pub fn into_domain(self, now: DateTime<Utc>) -> Result<AuthorizationRequest, ApiError> {
        if self.pan_hash.is_none() && self.token.is_none() {
            return Err(ApiError::BadRequest("request must carry panHash or token".to_string()));
        }
        if self.transaction_type.is_spend() && !self.amount.is_positive() {
            return Err(ApiError::BadRequest("amount must be greater than zero".to_string()));
        }
        Ok(AuthorizationRequest {
            request_id: RequestId::new(),
            masked_pan: self.masked_pan,
            pan_hash: self.pan_hash,
            token: self.token,
            expiry_month: self.expiry_month,
            expiry_year: self.expiry_year,
            merchant_id: self.merchant_id.into(),
            merchant_name: self.merchant_name,
            channel: self.channel,
            mcc: self.mcc,
            country_code: self.country_code,
            transaction_type: self.transaction_type,
            amount: self.amount,
            cryptogram: self.cryptogram,
            pin_data: self.pin_data,
            three_ds: self.three_ds.map(ThreeDsData::from),
            timestamp: now,
            processed: false,
            processed_at: None,
        })
    }
}


#[derive(Debug, Clone, Deserialize)]
pub struct ReverseAuthorizationRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeCompleteRequest {
    pub challenge_result: String,
}

//! Flat `Db*` row structs, one per table, each `FromRow` and convertible
//! to/from its `authz_types` domain counterpart. Mirrors the shape of
//! `openibank-db::models` (flat structs + explicit conversion functions
//! rather than deriving serde directly onto the domain type), because the
//! domain types carry nested enums/structs that don't map onto columns
//! one-to-one.

use crate::error::DbError;
use authz_types::{
    AccountId, AccountSpaceId, AuthorizationDecision, AuthorizationHold, AuthorizationRequest, CardId, Channel,
    Currency, Decision, DecisionId, DecisionPathEntry, HoldId, HoldStatus, LimitsSnapshot, MerchantId, Money,
    ReasonCode, RequestId, SpendingWindow, SpendingWindowId, TransactionType, WindowScope, WindowType,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::FromRow;

fn parse_currency(code: &str) -> Result<Currency, DbError> {
    Currency::parse(code).map_err(|e| DbError::Serialization(e.to_string()))
}

/// Encode a serde enum as the bare string its `rename_all` produces
/// (e.g. `Channel::ECommerce` -> `"E_COMMERCE"`), the same wire form the
/// closed reason-code and channel enums use.
fn enum_to_column<T: Serialize>(value: &T) -> Result<String, DbError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(DbError::Serialization(format!("expected string-like enum, got {other}"))),
    }
}

fn column_to_enum<T: DeserializeOwned>(value: &str) -> Result<T, DbError> {
    Ok(serde_json::from_value(serde_json::Value::String(value.to_string()))?)
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRequest {
    pub request_id: i64,
    pub masked_pan: String,
    pub pan_hash: Option<String>,
    pub token: Option<String>,
    pub expiry_month: i16,
    pub expiry_year: i16,
    pub merchant_id: i64,
    pub merchant_name: String,
    pub channel: String,
    pub mcc: String,
    pub country_code: String,
    pub transaction_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub cryptogram: Option<String>,
    pub pin_data: Option<String>,
    pub three_ds: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<&AuthorizationRequest> for DbRequest {
    type Error = DbError;

    fn try_from(r: &AuthorizationRequest) -> Result<Self, DbError> {
        Ok(Self {
            request_id: r.request_id.value(),
            masked_pan: r.masked_pan.clone(),
            pan_hash: r.pan_hash.clone(),
            token: r.token.clone(),
            expiry_month: r.expiry_month as i16,
            expiry_year: r.expiry_year as i16,
            merchant_id: r.merchant_id.value(),
            merchant_name: r.merchant_name.clone(),
            channel: enum_to_column(&r.channel)?,
            mcc: r.mcc.clone(),
            country_code: r.country_code.clone(),
            transaction_type: enum_to_column(&r.transaction_type)?,
            amount: r.amount.amount(),
            currency: r.amount.currency().as_str().to_string(),
            cryptogram: r.cryptogram.clone(),
            pin_data: r.pin_data.clone(),
            three_ds: r.three_ds.as_ref().map(serde_json::to_value).transpose()?,
            created_at: r.timestamp,
            processed: r.processed,
            processed_at: r.processed_at,
        })
    }
}

impl TryFrom<DbRequest> for AuthorizationRequest {
    type Error = DbError;

    fn try_from(row: DbRequest) -> Result<Self, DbError> {
        let currency = parse_currency(&row.currency)?;
        Ok(Self {
            request_id: RequestId::from(row.request_id),
            masked_pan: row.masked_pan,
            pan_hash: row.pan_hash,
            token: row.token,
            expiry_month: row.expiry_month as u8,
            expiry_year: row.expiry_year as u16,
            merchant_id: MerchantId::from(row.merchant_id),
            merchant_name: row.merchant_name,
            channel: column_to_enum::<Channel>(&row.channel)?,
            mcc: row.mcc,
            country_code: row.country_code,
            transaction_type: column_to_enum::<TransactionType>(&row.transaction_type)?,
            amount: Money::new(row.amount, currency),
            cryptogram: row.cryptogram,
            pin_data: row.pin_data,
            three_ds: row.three_ds.map(serde_json::from_value).transpose()?,
            timestamp: row.created_at,
            processed: row.processed,
            processed_at: row.processed_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbDecision {
    pub decision_id: i64,
    pub request_id: i64,
    pub decision: String,
    pub reason_code: String,
    pub reason_message: String,
    pub approved_amount: Decimal,
    pub currency: String,
    pub authorization_code: Option<String>,
    pub risk_score: Option<i16>,
    pub hold_id: Option<i64>,
    pub limits_snapshot: Option<serde_json::Value>,
    pub balance_snapshot: Option<serde_json::Value>,
    pub decision_path: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<&AuthorizationDecision> for DbDecision {
    type Error = DbError;

    fn try_from(d: &AuthorizationDecision) -> Result<Self, DbError> {
        Ok(Self {
            decision_id: d.decision_id.value(),
            request_id: d.request_id.value(),
            decision: enum_to_column(&d.decision)?,
            reason_code: enum_to_column(&d.reason_code)?,
            reason_message: d.reason_message.clone(),
            approved_amount: d.approved_amount.amount(),
            currency: d.currency.as_str().to_string(),
            authorization_code: d.authorization_code.clone(),
            risk_score: d.risk_score.map(|s| s as i16),
            hold_id: d.hold_id.map(|h| h.value()),
            limits_snapshot: d.limits_snapshot.as_ref().map(serde_json::to_value).transpose()?,
            balance_snapshot: d.balance_snapshot.as_ref().map(serde_json::to_value).transpose()?,
            decision_path: serde_json::to_value(&d.decision_path)?,
            created_at: d.created_at,
            expires_at: d.expires_at,
        })
    }
}

impl TryFrom<DbDecision> for AuthorizationDecision {
    type Error = DbError;

    fn try_from(row: DbDecision) -> Result<Self, DbError> {
        let currency = parse_currency(&row.currency)?;
        Ok(Self {
            decision_id: DecisionId::from(row.decision_id),
            request_id: RequestId::from(row.request_id),
            decision: column_to_enum::<Decision>(&row.decision)?,
            reason_code: column_to_enum::<ReasonCode>(&row.reason_code)?,
            reason_message: row.reason_message,
            approved_amount: Money::new(row.approved_amount, currency),
            currency,
            authorization_code: row.authorization_code,
            risk_score: row.risk_score.map(|s| s as u8),
            hold_id: row.hold_id.map(HoldId::from),
            limits_snapshot: row
                .limits_snapshot
                .map(serde_json::from_value::<LimitsSnapshot>)
                .transpose()?,
            balance_snapshot: row.balance_snapshot.map(serde_json::from_value).transpose()?,
            decision_path: serde_json::from_value::<Vec<DecisionPathEntry>>(row.decision_path)?,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbHold {
    pub hold_id: i64,
    pub request_id: i64,
    pub decision_id: i64,
    pub account_id: i64,
    pub account_space_id: Option<i64>,
    pub card_id: i64,
    pub merchant_id: i64,
    pub merchant_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub fx_origin: Option<serde_json::Value>,
    pub authorization_code: String,
    pub status: String,
    pub captured_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<&AuthorizationHold> for DbHold {
    type Error = DbError;

    fn try_from(h: &AuthorizationHold) -> Result<Self, DbError> {
        Ok(Self {
            hold_id: h.hold_id.value(),
            request_id: h.request_id.value(),
            decision_id: h.decision_id.value(),
            account_id: h.account_id.value(),
            account_space_id: h.account_space_id.map(|a| a.value()),
            card_id: h.card_id.value(),
            merchant_id: h.merchant_id.value(),
            merchant_name: h.merchant_name.clone(),
            amount: h.amount.amount(),
            currency: h.amount.currency().as_str().to_string(),
            fx_origin: h.fx_origin.as_ref().map(serde_json::to_value).transpose()?,
            authorization_code: h.authorization_code.clone(),
            status: enum_to_column(&h.status)?,
            captured_amount: h.captured_amount.amount(),
            created_at: h.created_at,
            updated_at: h.updated_at,
            captured_at: h.captured_at,
            expires_at: h.expires_at,
        })
    }
}

impl TryFrom<DbHold> for AuthorizationHold {
    type Error = DbError;

    fn try_from(row: DbHold) -> Result<Self, DbError> {
        let currency = parse_currency(&row.currency)?;
        Ok(Self {
            hold_id: HoldId::from(row.hold_id),
            request_id: RequestId::from(row.request_id),
            decision_id: DecisionId::from(row.decision_id),
            account_id: AccountId::from(row.account_id),
            account_space_id: row.account_space_id.map(AccountSpaceId::from),
            card_id: CardId::from(row.card_id),
            merchant_id: MerchantId::from(row.merchant_id),
            merchant_name: row.merchant_name,
            amount: Money::new(row.amount, currency),
            fx_origin: row.fx_origin.map(serde_json::from_value).transpose()?,
            authorization_code: row.authorization_code,
            status: column_to_enum::<HoldStatus>(&row.status)?,
            captured_amount: Money::new(row.captured_amount, currency),
            created_at: row.created_at,
            updated_at: row.updated_at,
            captured_at: row.captured_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbSpendingWindow {
    pub window_id: i64,
    pub card_id: i64,
    pub account_id: i64,
    pub window_type: String,
    pub period_start: NaiveDate,
    pub scope: serde_json::Value,
    pub limit_amount: Decimal,
    pub spent_amount: Decimal,
    pub currency: String,
    pub transaction_count: i64,
    pub last_transaction_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&SpendingWindow> for DbSpendingWindow {
    type Error = DbError;

    fn try_from(w: &SpendingWindow) -> Result<Self, DbError> {
        Ok(Self {
            window_id: w.window_id.value(),
            card_id: w.card_id.value(),
            account_id: w.account_id.value(),
            window_type: enum_to_column(&w.window_type)?,
            period_start: w.period_start,
            scope: serde_json::to_value(&w.scope)?,
            limit_amount: w.limit_amount.amount(),
            spent_amount: w.spent_amount.amount(),
            currency: w.limit_amount.currency().as_str().to_string(),
            transaction_count: w.transaction_count as i64,
            last_transaction_time: w.last_transaction_time,
            updated_at: w.updated_at,
        })
    }
}

impl TryFrom<DbSpendingWindow> for SpendingWindow {
    type Error = DbError;

    fn try_from(row: DbSpendingWindow) -> Result<Self, DbError> {
        let currency = parse_currency(&row.currency)?;
        Ok(Self {
            window_id: SpendingWindowId::from(row.window_id),
            card_id: CardId::from(row.card_id),
            account_id: AccountId::from(row.account_id),
            window_type: column_to_enum::<WindowType>(&row.window_type)?,
            period_start: row.period_start,
            scope: serde_json::from_value::<WindowScope>(row.scope)?,
            limit_amount: Money::new(row.limit_amount, currency),
            spent_amount: Money::new(row.spent_amount, currency),
            transaction_count: row.transaction_count as u64,
            last_transaction_time: row.last_transaction_time,
            updated_at: row.updated_at,
        })
    }
}

/// Canonical string form of a [`WindowScope`], used as the scope
/// component of the spending window's unique key. Field order is fixed
/// by the struct definition, so this is stable across calls.
pub fn scope_key(scope: &WindowScope) -> Result<String, DbError> {
    Ok(serde_json::to_string(scope)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_types::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn request_round_trips_through_db_row() {
        let now = Utc::now();
        let request = AuthorizationRequest {
            request_id: RequestId::new(),
            masked_pan: "411111******1111".to_string(),
            pan_hash: Some("hash".to_string()),
            token: None,
            expiry_month: 12,
            expiry_year: 2030,
            merchant_id: MerchantId::new(),
            merchant_name: "Acme".to_string(),
            channel: Channel::ECommerce,
            mcc: "5999".to_string(),
            country_code: "US".to_string(),
            transaction_type: TransactionType::Purchase,
            amount: Money::new(dec!(125.50), Currency::USD),
            cryptogram: None,
            pin_data: None,
            three_ds: None,
            timestamp: now,
            processed: false,
            processed_at: None,
        };
        let row = DbRequest::try_from(&request).unwrap();
        assert_eq!(row.channel, "E_COMMERCE");
        assert_eq!(row.transaction_type, "PURCHASE");
        let back: AuthorizationRequest = row.try_into().unwrap();
        assert_eq!(back.request_id, request.request_id);
        assert_eq!(back.amount, request.amount);
        assert_eq!(back.channel, request.channel);
    }

    #[test]
    fn scope_key_is_stable_for_equal_scopes() {
        let a = WindowScope {
            channel: Some(Channel::Atm),
            country_code: None,
            mcc: None,
        };
        let b = WindowScope {
            channel: Some(Channel::Atm),
            country_code: None,
            mcc: None,
        };
        assert_eq!(scope_key(&a).unwrap(), scope_key(&b).unwrap());
    }
}

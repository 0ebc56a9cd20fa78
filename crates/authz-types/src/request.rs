//! The inbound authorization request: the as-written shape of a card
//! transaction coming off the network, before any evaluator has touched it.

use crate::{MerchantId, Money, RequestId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Pos,
    ECommerce,
    Atm,
    MobileApp,
    Contactless,
    ManualEntry,
    Recurring,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Purchase,
    Withdrawal,
    BalanceInquiry,
    Transfer,
    Payment,
    Refund,
    PreAuthorization,
    Capture,
    Reversal,
    PinChange,
}

impl TransactionType {
    /// Transaction types that move money out of the account and therefore
    /// participate in spending-window accounting.
    pub fn is_spend(&self) -> bool {
        !matches!(
            self,
            TransactionType::BalanceInquiry | TransactionType::Reversal | TransactionType::PinChange
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreeDsData {
    pub eci: Option<String>,
    pub cavv: Option<String>,
    pub xid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub request_id: RequestId,
    /// Masked PAN for logging/display, e.g. `"411111******1111"`. The raw
    /// PAN never appears on this type.
    pub masked_pan: String,
    pub pan_hash: Option<String>,
    pub token: Option<String>,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub channel: Channel,
    pub mcc: String,
    pub country_code: String,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub cryptogram: Option<String>,
    pub pin_data: Option<String>,
    pub three_ds: Option<ThreeDsData>,
    pub timestamp: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
}

impl AuthorizationRequest {
    /// At least one of panHash or token must be present.
    pub fn has_card_reference(&self) -> bool {
        self.pan_hash.is_some() || self.token.is_some()
    }
}

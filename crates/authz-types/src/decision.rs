//! The outcome of running an [`crate::AuthorizationRequest`] through the
//! authorization pipeline: the decision itself, the closed reason-code
//! enum, and the step-by-step audit trail (`decisionPath`).

use crate::{BalanceSnapshot, Currency, DecisionId, HoldId, Money, RequestId, SpendingWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Declined,
    Challenge,
    Partial,
}

/// The closed reason-code enum, carried as a payment-network style
/// two-digit code plus a short name. Every evaluator maps its own typed
/// error onto exactly one of these; no other value may ever be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    ApprovedTransaction,
    ApprovedWithId,
    ApprovedPartial,
    ApprovedVip,
    InvalidCard,
    ExpiredCard,
    CardNotActive,
    CardRestricted,
    CardLostStolen,
    ExceedsWithdrawalLimit,
    ExceedsDailyLimit,
    ExceedsMonthlyLimit,
    ExceedsTransactionLimit,
    InsufficientFunds,
    AccountClosed,
    SuspectedFraud,
    SecurityViolation,
    InvalidPin,
    ExceedsPinRetries,
    VerificationRequired,
    AdditionalAuthenticationRequired,
    SystemError,
    FormatError,
    DuplicateTransaction,
    IssuerUnavailable,
    /// A dedicated code for authorization reversal, kept distinct from
    /// `DuplicateTransaction` internally so a reversed authorization is
    /// never confused with a replayed request, while still reporting "94"
    /// at the wire boundary for compatibility.
    AuthorizationReversed,
}

impl ReasonCode {
    /// The two-digit code this reason surfaces as at the HTTP/network
    /// boundary. `AuthorizationReversed` shares "94" with
    /// `DuplicateTransaction` at the wire level; they remain distinct
    /// variants internally.
    pub fn code(&self) -> &'static str {
        match self {
            ReasonCode::ApprovedTransaction => "00",
            ReasonCode::ApprovedWithId => "08",
            ReasonCode::ApprovedPartial => "10",
            ReasonCode::ApprovedVip => "11",
            ReasonCode::InvalidCard => "14",
            ReasonCode::ExpiredCard => "54",
            ReasonCode::CardNotActive => "62",
            ReasonCode::CardRestricted => "36",
            ReasonCode::CardLostStolen => "41",
            ReasonCode::ExceedsWithdrawalLimit => "61",
            ReasonCode::ExceedsDailyLimit => "65",
            ReasonCode::ExceedsMonthlyLimit => "66",
            ReasonCode::ExceedsTransactionLimit => "13",
            ReasonCode::InsufficientFunds => "51",
            ReasonCode::AccountClosed => "64",
            ReasonCode::SuspectedFraud => "59",
            ReasonCode::SecurityViolation => "63",
            ReasonCode::InvalidPin => "55",
            ReasonCode::ExceedsPinRetries => "75",
            ReasonCode::VerificationRequired => "01",
            ReasonCode::AdditionalAuthenticationRequired => "02",
            ReasonCode::SystemError => "96",
            ReasonCode::FormatError => "30",
            ReasonCode::DuplicateTransaction => "94",
            ReasonCode::AuthorizationReversed => "94",
            ReasonCode::IssuerUnavailable => "91",
        }
    }

    /// Whether this reason code may only be attached to an APPROVED or
    /// PARTIAL decision.
    pub fn is_approval_class(&self) -> bool {
        matches!(
            self,
            ReasonCode::ApprovedTransaction
                | ReasonCode::ApprovedWithId
                | ReasonCode::ApprovedPartial
                | ReasonCode::ApprovedVip
        )
    }
}

/// One step of the pipeline's audit trail: which evaluator ran, what it
/// decided, and when. Appended in order as `authorize()` walks the
/// pipeline; persisted alongside the decision for dispute resolution.
/// `hash`/`prev_hash` link each entry into the chain `authz-audit` builds,
/// so the trail as a whole can be verified tamper-evident end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionPathEntry {
    pub component: String,
    pub outcome: String,
    pub reason_code: Option<ReasonCode>,
    pub at: DateTime<Utc>,
    pub prev_hash: Option<String>,
    pub hash: String,
}

/// The headroom remaining in each limit tier at the moment a request passed
/// (or would have passed) the limit evaluator: the channel-adjusted
/// transaction limit plus the daily and monthly windows it was checked
/// against. Carried on the decision so a disputed authorization can be
/// explained without recomputing the limit tier after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSnapshot {
    pub transaction_limit: Money,
    pub daily_window: SpendingWindow,
    pub monthly_window: SpendingWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    pub decision_id: DecisionId,
    pub request_id: RequestId,
    pub decision: Decision,
    pub reason_code: ReasonCode,
    pub reason_message: String,
    pub approved_amount: Money,
    pub currency: Currency,
    /// Set only on APPROVED/PARTIAL.
    pub authorization_code: Option<String>,
    pub risk_score: Option<u8>,
    pub hold_id: Option<HoldId>,
    pub limits_snapshot: Option<LimitsSnapshot>,
    pub balance_snapshot: Option<BalanceSnapshot>,
    pub decision_path: Vec<DecisionPathEntry>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthorizationDecision {
    pub fn is_terminal_decline(&self) -> bool {
        matches!(self.decision, Decision::Declined)
    }

    /// A hold exists iff the decision is APPROVED or PARTIAL.
    pub fn requires_hold(&self) -> bool {
        matches!(self.decision, Decision::Approved | Decision::Partial)
    }

    pub fn tip_hash(&self) -> Option<&str> {
        self.decision_path.last().map(|e| e.hash.as_str())
    }
}

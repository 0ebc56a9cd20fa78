//! Authorization Orchestrator: the single entry point that drives the
//! validate -> limit -> risk -> balance -> hold pipeline, forms and
//! persists the resulting [`AuthorizationDecision`], and owns the two
//! post-creation transitions a decision can undergo: reversal and
//! challenge completion.
//!
//! Every evaluator in the pipeline is consulted inline: a `BusinessDecline`
//! from any of them is not propagated as an `Err` here - it is turned into
//! a persisted DECLINED decision, because a business decline is the normal
//! outcome of authorizing a transaction, not a failure of the orchestrator
//! itself. Anything else (a collaborator timing out, an unknown decision
//! id, an invalid-state transition) surfaces as [`OrchestratorError`].

pub mod config;
pub mod error;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;

use authz_audit::DecisionPathBuilder;
use authz_balance::{BalanceChecker, BalanceError};
use authz_card_directory::CardDirectory;
use authz_core::KeyedLock;
use authz_crypto::request_id_from_idempotency_key;
use authz_db::repos::{DecisionStore, RequestStore};
use authz_fx::Fx;
use authz_holds::{HoldManager, HoldsError, HoldsConfig};
use authz_ledger::Ledger;
use authz_limits::{LimitEvaluator, LimitsConfig, LimitsError, SpendingWindowStore};
use authz_risk::{RiskConfig, RiskEngine, RiskRecommendation};
use authz_types::{
    AuthorizationDecision, AuthorizationRequest, CardDetails, Channel, Decision, DecisionId, HoldFxOrigin,
    LimitsSnapshot, Money, ReasonCode, RequestId,
};
use authz_validator::{CardValidator, ValidatorError};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;

/// How `approve`/`decline` should land their outcome: a fresh row for a
/// first-pass request, or folded into a decision row that already exists
/// (resuming past a CHALLENGE) - `DecisionStore::insert`'s unique
/// constraint on `request_id` would otherwise reject the second case.
#[derive(Clone, Copy)]
enum Persist<'a> {
    Insert,
    Update(&'a AuthorizationDecision),
}

pub struct AuthorizationOrchestrator {
    validator: CardValidator,
    limits: LimitEvaluator,
    risk: RiskEngine,
    balance: BalanceChecker,
    holds: HoldManager,
    requests: Arc<dyn RequestStore>,
    decisions: Arc<dyn DecisionStore>,
    config: OrchestratorConfig,
    request_locks: KeyedLock<RequestId>,
}

impl AuthorizationOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        card_directory: Arc<dyn CardDirectory>,
        ledger: Arc<dyn Ledger>,
        fx: Arc<dyn Fx>,
        spending_windows: Arc<dyn SpendingWindowStore>,
        holds_store: Arc<dyn authz_holds::HoldStore>,
        requests: Arc<dyn RequestStore>,
        decisions: Arc<dyn DecisionStore>,
        limits_config: LimitsConfig,
        risk_config: RiskConfig,
        holds_config: HoldsConfig,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            validator: CardValidator::new(card_directory),
            limits: LimitEvaluator::new(spending_windows, limits_config),
            risk: RiskEngine::new(risk_config),
            balance: BalanceChecker::new(ledger.clone(), fx),
            holds: HoldManager::new(holds_store, ledger, holds_config),
            requests,
            decisions,
            config,
            request_locks: KeyedLock::new(),
        }
    }

    /// Single entry: runs `request` through the full pipeline, or returns
    /// the already-persisted decision unchanged if this requestId (or the
    /// requestId derived from `idempotency_key`) was seen before.
    pub async fn authorize(
        &self,
        mut request: AuthorizationRequest,
        idempotency_key: Option<&str>,
    ) -> Result<AuthorizationDecision, OrchestratorError> {
        if let Some(key) = idempotency_key {
            request.request_id = request_id_from_idempotency_key(key);
        }
        let request_id = request.request_id;
        let _guard = self.request_locks.lock(request_id).await;

        if let Some(existing) = self.decisions.find_by_request_id(request_id).await? {
            return Ok(existing);
        }

        self.requests.insert(&request).await?;

        let now = Utc::now();
        let mut path = DecisionPathBuilder::new();

        let card = match self.validator.validate(&request).await {
            Ok(card) => {
                path.append("card_validation", "PASSED", None, now);
                card
            }
            Err(err) => match validator_reason(&err) {
                Some(reason) => return self.decline(request, path, reason, &err.to_string(), None, now).await,
                None => return Err(error::propagate(err)),
            },
        };

        let limits_snapshot = match self.limits.check(&request, &card, now).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                return match limits_reason(&err) {
                    Some(reason) => self.decline(request, path, reason, &err.to_string(), None, now).await,
                    None => Err(error::propagate(err)),
                };
            }
        };
        path.append("limit_evaluation", "PASSED", None, now);

        let risk = self.risk.assess(&request, &card);
        path.append(
            "risk_assessment",
            format!("{:?} score={}", risk.recommendation, risk.score),
            None,
            now,
        );
        match risk.recommendation {
            RiskRecommendation::Decline => {
                return self
                    .decline(
                        request,
                        path,
                        ReasonCode::SuspectedFraud,
                        "risk engine recommended decline",
                        Some(limits_snapshot),
                        now,
                    )
                    .await;
            }
            RiskRecommendation::Challenge => {
                return self.challenge(request, path, risk.score, Some(limits_snapshot), now).await;
            }
            RiskRecommendation::Approve => {}
        }

        self.approve(request, card, path, Some(risk.score), Some(limits_snapshot), Persist::Insert, now).await
    }

    /// Runs the balance-check-through-hold-creation portion of the
    /// pipeline and forms an APPROVED or PARTIAL decision. Shared by the
    /// first-pass `authorize` flow (`Persist::Insert`, a brand-new
    /// decision row) and by `challenge_complete` on success
    /// (`Persist::Update`, folding the resumed pipeline's outcome into
    /// the CHALLENGE row already occupying this requestId rather than
    /// inserting a second row that the unique constraint would reject).
    async fn approve(
        &self,
        request: AuthorizationRequest,
        card: CardDetails,
        mut path: DecisionPathBuilder,
        risk_score: Option<u8>,
        limits_snapshot: Option<LimitsSnapshot>,
        persist: Persist<'_>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationDecision, OrchestratorError> {
        let request_id = request.request_id;
        let (decision_id, created_at) = match persist {
            Persist::Insert => (DecisionId::new(), now),
            Persist::Update(existing) => (existing.decision_id, existing.created_at),
        };

        let balance_outcome = match self.balance.check(card.account_id, card.account_currency, request.amount).await {
            Ok(outcome) => {
                path.append("balance_check", "PASSED", None, now);
                outcome
            }
            Err(err) => match balance_reason(&err) {
                Some(reason) => {
                    return match persist {
                        Persist::Insert => {
                            self.decline(request, path, reason, &err.to_string(), limits_snapshot, now).await
                        }
                        Persist::Update(existing) => {
                            self.decline_existing(existing, path, reason, &err.to_string(), limits_snapshot, now).await
                        }
                    };
                }
                None => return Err(error::propagate(err)),
            },
        };

        let authorization_code = generate_authorization_code();
        let fx_origin = balance_outcome.snapshot.fx.map(|fx| HoldFxOrigin {
            original_amount: balance_outcome.approved_amount.amount(),
            original_currency: balance_outcome.approved_amount.currency(),
            exchange_rate: fx.rate,
        });

        let hold = match self
            .holds
            .create(
                request_id,
                decision_id,
                card.account_id,
                card.account_space_id,
                card.card_id,
                request.merchant_id,
                request.merchant_name.clone(),
                balance_outcome.approved_amount_account_currency,
                fx_origin,
                authorization_code.clone(),
                now,
            )
            .await
        {
            Ok(hold) => {
                path.append("hold_creation", "PASSED", None, now);
                hold
            }
            Err(err) => match holds_create_reason(&err) {
                Some(reason) => {
                    return match persist {
                        Persist::Insert => {
                            self.decline(request, path, reason, &err.to_string(), limits_snapshot, now).await
                        }
                        Persist::Update(existing) => {
                            self.decline_existing(existing, path, reason, &err.to_string(), limits_snapshot, now).await
                        }
                    };
                }
                None => return Err(error::propagate(err)),
            },
        };

        if let Err(err) = self
            .limits
            .update_spending_counters(
                request_id,
                &card,
                request.channel,
                balance_outcome.approved_amount,
                request.timestamp,
                false,
                now,
            )
            .await
        {
            // Hold is already ACTIVE; undo it rather than leave an approval
            // on the books with no corresponding counter commit.
            let _ = self.holds.release(hold.hold_id, None, now).await;
            return Err(error::propagate(err));
        }
        path.append("spending_counter_commit", "PASSED", None, now);

        let authorization_decision = AuthorizationDecision {
            decision_id,
            request_id,
            decision: Decision::Approved,
            reason_code: ReasonCode::ApprovedTransaction,
            reason_message: decision_message(ReasonCode::ApprovedTransaction),
            approved_amount: balance_outcome.approved_amount,
            currency: balance_outcome.approved_amount.currency(),
            authorization_code: Some(authorization_code),
            risk_score,
            hold_id: Some(hold.hold_id),
            limits_snapshot,
            balance_snapshot: Some(balance_outcome.snapshot),
            decision_path: path.into_entries(),
            created_at,
            expires_at: Some(now + self.config.approved_ttl),
        };

        let persisted = match persist {
            Persist::Insert => self.decisions.insert(&authorization_decision).await,
            Persist::Update(_) => self.decisions.update(&authorization_decision).await,
        };
        if let Err(err) = persisted {
            let _ = self.holds.release(hold.hold_id, None, now).await;
            let _ = self
                .limits
                .update_spending_counters(
                    request_id,
                    &card,
                    request.channel,
                    balance_outcome.approved_amount,
                    request.timestamp,
                    true,
                    now,
                )
                .await;
            return Err(error::propagate(err));
        }
        self.requests.mark_processed(request_id, now).await?;

        Ok(authorization_decision)
    }

    async fn challenge(
        &self,
        request: AuthorizationRequest,
        mut path: DecisionPathBuilder,
        risk_score: u8,
        limits_snapshot: Option<LimitsSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationDecision, OrchestratorError> {
        path.append("risk_assessment", "CHALLENGE", None, now);
        let decision = AuthorizationDecision {
            decision_id: DecisionId::new(),
            request_id: request.request_id,
            decision: Decision::Challenge,
            reason_code: ReasonCode::AdditionalAuthenticationRequired,
            reason_message: "additional authentication required before this transaction can proceed".to_string(),
            approved_amount: Money::zero(request.amount.currency()),
            currency: request.amount.currency(),
            authorization_code: None,
            risk_score: Some(risk_score),
            hold_id: None,
            limits_snapshot,
            balance_snapshot: None,
            decision_path: path.into_entries(),
            created_at: now,
            expires_at: Some(now + self.config.challenge_ttl),
        };
        self.decisions.insert(&decision).await?;
        self.requests.mark_processed(request.request_id, now).await?;
        Ok(decision)
    }

    async fn decline(
        &self,
        request: AuthorizationRequest,
        mut path: DecisionPathBuilder,
        reason: ReasonCode,
        detail: &str,
        limits_snapshot: Option<LimitsSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationDecision, OrchestratorError> {
        path.append("pipeline", format!("DECLINED: {detail}"), Some(reason), now);
        let decision = AuthorizationDecision {
            decision_id: DecisionId::new(),
            request_id: request.request_id,
            decision: Decision::Declined,
            reason_code: reason,
            reason_message: decision_message(reason),
            approved_amount: Money::zero(request.amount.currency()),
            currency: request.amount.currency(),
            authorization_code: None,
            risk_score: None,
            hold_id: None,
            limits_snapshot,
            balance_snapshot: None,
            decision_path: path.into_entries(),
            created_at: now,
            expires_at: None,
        };
        self.decisions.insert(&decision).await?;
        self.requests.mark_processed(request.request_id, now).await?;
        Ok(decision)
    }

    /// Same decline as [`Self::decline`], but folds into a decision row
    /// that already exists instead of inserting a new one - used when
    /// resuming past a CHALLENGE, since the row this requestId owns was
    /// created when the challenge was first issued.
    async fn decline_existing(
        &self,
        existing: &AuthorizationDecision,
        mut path: DecisionPathBuilder,
        reason: ReasonCode,
        detail: &str,
        limits_snapshot: Option<LimitsSnapshot>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationDecision, OrchestratorError> {
        path.append("pipeline", format!("DECLINED: {detail}"), Some(reason), now);
        let mut resolved = existing.clone();
        resolved.decision = Decision::Declined;
        resolved.reason_code = reason;
        resolved.reason_message = decision_message(reason);
        resolved.approved_amount = Money::zero(resolved.currency);
        resolved.hold_id = None;
        resolved.limits_snapshot = limits_snapshot;
        resolved.balance_snapshot = None;
        resolved.decision_path = path.into_entries();
        resolved.expires_at = None;
        self.decisions.update(&resolved).await?;
        self.requests.mark_processed(resolved.request_id, now).await?;
        Ok(resolved)
    }

    /// Reversal: only valid from APPROVED/PARTIAL.
    /// Transitions the decision to DECLINED with reason
    /// `AUTHORIZATION_REVERSED`, releases the hold (idempotent), and
    /// reverses the spending-counter commit.
    pub async fn reverse_authorization(
        &self,
        request_id: RequestId,
        card: &CardDetails,
        channel: Channel,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationDecision, OrchestratorError> {
        let _guard = self.request_locks.lock(request_id).await;

        let mut decision = self
            .decisions
            .find_by_request_id(request_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("decision for request {request_id}")))?;

        if !matches!(decision.decision, Decision::Approved | Decision::Partial) {
            return Err(OrchestratorError::InvalidState(format!(
                "decision {} is {:?}, not APPROVED/PARTIAL",
                decision.decision_id, decision.decision
            )));
        }

        if let Some(hold_id) = decision.hold_id {
            self.holds.release(hold_id, Some(&format!("reverse:{request_id}")), now).await.map_err(error::propagate)?;
        }

        self.limits
            .update_spending_counters(request_id, card, channel, decision.approved_amount, now, true, now)
            .await
            .map_err(error::propagate)?;

        decision.decision = Decision::Declined;
        decision.reason_code = ReasonCode::AuthorizationReversed;
        decision.reason_message = format!("authorization reversed: {reason}");
        decision.approved_amount = Money::zero(decision.currency);

        self.decisions.update(&decision).await?;
        Ok(decision)
    }

    /// Challenge completion: only valid from
    /// CHALLENGE, and only before its `expiresAt`. On `"SUCCESS"`, resumes
    /// the pipeline from the balance check and settles into
    /// APPROVED/PARTIAL; anything else settles into DECLINED with reason
    /// `SECURITY_VIOLATION`.
    pub async fn challenge_complete(
        &self,
        request_id: RequestId,
        card: CardDetails,
        challenge_result: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationDecision, OrchestratorError> {
        let _guard = self.request_locks.lock(request_id).await;

        let decision = self
            .decisions
            .find_by_request_id(request_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("decision for request {request_id}")))?;

        if decision.decision != Decision::Challenge {
            return Err(OrchestratorError::InvalidState(format!(
                "decision {} is {:?}, not CHALLENGE",
                decision.decision_id, decision.decision
            )));
        }
        if decision.expires_at.map(|exp| now > exp).unwrap_or(false) {
            return Err(OrchestratorError::ChallengeExpired);
        }

        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(format!("request {request_id}")))?;

        let mut path = DecisionPathBuilder::new();
        path.append("challenge_completion", challenge_result, None, now);

        if challenge_result.eq_ignore_ascii_case("SUCCESS") {
            // Resumes the pipeline from the balance check and folds the
            // outcome into the CHALLENGE row via `Persist::Update` -
            // `approve`'s own `Persist::Insert` path would conflict with
            // the row this requestId already owns.
            self.approve(
                request,
                card,
                path,
                decision.risk_score,
                decision.limits_snapshot.clone(),
                Persist::Update(&decision),
                now,
            )
            .await
        } else {
            let mut resolved = decision.clone();
            resolved.decision = Decision::Declined;
            resolved.reason_code = ReasonCode::SecurityViolation;
            resolved.reason_message = "challenge failed security verification".to_string();
            resolved.approved_amount = Money::zero(resolved.currency);
            path.append("challenge_completion", "DECLINED", Some(ReasonCode::SecurityViolation), now);
            resolved.decision_path.extend(path.into_entries());
            self.decisions.update(&resolved).await?;
            self.requests.mark_processed(resolved.request_id, now).await?;
            Ok(resolved)
        }
    }
}

fn decision_message(reason: ReasonCode) -> String {
    format!("{reason:?}")
}

fn generate_authorization_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

/// Maps a validator failure onto a reason code, or `None` if the failure
/// should propagate instead of being recorded as a decline (a card
/// directory outage is not a business decision).
fn validator_reason(err: &ValidatorError) -> Option<ReasonCode> {
    match err {
        ValidatorError::MissingCardReference => Some(ReasonCode::InvalidCard),
        ValidatorError::ExpiredCard => Some(ReasonCode::ExpiredCard),
        ValidatorError::CardNotActive => Some(ReasonCode::CardNotActive),
        ValidatorError::CardLostStolen => Some(ReasonCode::CardLostStolen),
        ValidatorError::Directory(authz_card_directory::CardDirectoryError::CardNotFound) => {
            Some(ReasonCode::InvalidCard)
        }
        ValidatorError::Directory(authz_card_directory::CardDirectoryError::Unavailable(_)) => None,
    }
}

/// Maps a limit-evaluator failure onto a reason code. ATM withdrawal caps
/// get their own network code (61); the contactless/online per-channel
/// caps have no dedicated code in the closed reason-code enum, so they
/// share `EXCEEDS_TRANSACTION_LIMIT` (13) and are distinguished in
/// `reasonMessage` instead.
fn limits_reason(err: &LimitsError) -> Option<ReasonCode> {
    match err {
        LimitsError::ExceedsTransactionLimit => Some(ReasonCode::ExceedsTransactionLimit),
        LimitsError::ExceedsWithdrawalLimit => Some(ReasonCode::ExceedsWithdrawalLimit),
        LimitsError::ExceedsContactlessLimit | LimitsError::ExceedsOnlineLimit => {
            Some(ReasonCode::ExceedsTransactionLimit)
        }
        LimitsError::ExceedsDailyLimit => Some(ReasonCode::ExceedsDailyLimit),
        LimitsError::ExceedsMonthlyLimit => Some(ReasonCode::ExceedsMonthlyLimit),
        LimitsError::NoLimitTier | LimitsError::StoreUnavailable(_) => None,
    }
}

fn balance_reason(err: &BalanceError) -> Option<ReasonCode> {
    match err {
        BalanceError::InsufficientFunds { .. } => Some(ReasonCode::InsufficientFunds),
        BalanceError::Ledger(_) | BalanceError::Fx(_) => None,
    }
}

/// A hold-creation failure only reaches here as a ledger shortfall, which
/// fails the whole authorization with `INSUFFICIENT_FUNDS`; anything else
/// (store outage, not-found) propagates.
fn holds_create_reason(err: &HoldsError) -> Option<ReasonCode> {
    match err {
        HoldsError::Ledger(authz_ledger::LedgerError::InsufficientAvailable { .. }) => {
            Some(ReasonCode::InsufficientFunds)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_card_directory::mock::InMemoryCardDirectory;
    use authz_db::repos::{InMemoryDecisionStore, InMemoryRequestStore};
    use authz_fx::mock::StaticFxProvider;
    use authz_holds::InMemoryHoldStore;
    use authz_ledger::InMemoryLedger;
    use authz_limits::InMemorySpendingWindowStore;
    use authz_types::{
        AccountId, CardId, CardStatus, Currency, ExpiryDate, LimitScope, LimitTier, MerchantId, TransactionType,
    };
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    struct Harness {
        orchestrator: AuthorizationOrchestrator,
        card_directory: Arc<InMemoryCardDirectory>,
        ledger: Arc<InMemoryLedger>,
        requests: Arc<InMemoryRequestStore>,
        account_id: AccountId,
    }

    async fn harness(opening_balance: rust_decimal::Decimal) -> Harness {
        let card_directory = Arc::new(InMemoryCardDirectory::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let fx = Arc::new(StaticFxProvider::new());
        let spending_windows = Arc::new(InMemorySpendingWindowStore::new());
        let holds_store = Arc::new(InMemoryHoldStore::new());
        let requests = Arc::new(InMemoryRequestStore::new());
        let decisions = Arc::new(InMemoryDecisionStore::new());

        let account_id = AccountId::new();
        let card = CardDetails {
            card_id: CardId::new(),
            status: CardStatus::Active,
            expiry: ExpiryDate { month: 12, year: 2099 },
            issuer_country: Some("US".to_string()),
            three_ds_enrollment_status: Some("Y".to_string()),
            account_id,
            account_space_id: None,
            account_currency: Currency::USD,
            product_code: Some("GOLD".to_string()),
            limit_tiers: vec![LimitTier {
                scope: LimitScope::Default,
                transaction_limit: Money::new(dec!(5000.00), Currency::USD),
                daily_limit: Money::new(dec!(5000.00), Currency::USD),
                monthly_limit: Money::new(dec!(50000.00), Currency::USD),
                atm_daily_limit: None,
                contactless_limit: None,
                online_limit: None,
            }],
        };
        card_directory.register(Some("hash-1"), None, card).await;
        ledger.seed(account_id, Money::new(opening_balance, Currency::USD)).await;

        let orchestrator = AuthorizationOrchestrator::new(
            card_directory.clone() as Arc<dyn CardDirectory>,
            ledger.clone() as Arc<dyn Ledger>,
            fx,
            spending_windows,
            holds_store,
            requests.clone(),
            decisions,
            LimitsConfig::default(),
            RiskConfig::default(),
            HoldsConfig::default(),
            OrchestratorConfig::default(),
        );

        Harness {
            orchestrator,
            card_directory,
            ledger,
            requests,
            account_id,
        }
    }

    fn clean_request(amount: rust_decimal::Decimal) -> AuthorizationRequest {
        AuthorizationRequest {
            request_id: RequestId::new(),
            masked_pan: "411111******1111".to_string(),
            pan_hash: Some("hash-1".to_string()),
            token: None,
            expiry_month: 12,
            expiry_year: 2099,
            merchant_id: MerchantId::new(),
            merchant_name: "Acme".to_string(),
            channel: Channel::Pos,
            mcc: "5411".to_string(),
            country_code: "US".to_string(),
            transaction_type: TransactionType::Purchase,
            amount: Money::new(amount, Currency::USD),
            cryptogram: None,
            pin_data: None,
            three_ds: None,
            timestamp: Utc.with_ymd_and_hms(2026, 7, 28, 14, 0, 0).unwrap(),
            processed: false,
            processed_at: None,
        }
    }

    // score 70: high_value(+20) + round_amount(+5) + unusual_country(+30) + unusual_merchant_category(+15)
    fn challenge_request() -> AuthorizationRequest {
        let mut request = clean_request(dec!(1500.00));
        request.country_code = "CA".to_string();
        request.mcc = "7995".to_string();
        request
    }

    #[tokio::test]
    async fn clean_request_approves_in_full_and_creates_a_hold() {
        let h = harness(dec!(10000.00)).await;
        let decision = h.orchestrator.authorize(clean_request(dec!(125.50)), None).await.unwrap();
        assert_eq!(decision.decision, Decision::Approved);
        assert_eq!(decision.reason_code, ReasonCode::ApprovedTransaction);
        assert!(decision.hold_id.is_some());
        assert_eq!(decision.approved_amount, Money::new(dec!(125.50), Currency::USD));
    }

    #[tokio::test]
    async fn insufficient_funds_declines_without_a_hold() {
        let h = harness(dec!(10.00)).await;
        let decision = h.orchestrator.authorize(clean_request(dec!(125.50)), None).await.unwrap();
        assert_eq!(decision.decision, Decision::Declined);
        assert_eq!(decision.reason_code, ReasonCode::InsufficientFunds);
        assert!(decision.hold_id.is_none());
    }

    #[tokio::test]
    async fn same_request_id_authorized_twice_returns_the_original_decision() {
        let h = harness(dec!(10000.00)).await;
        let request = clean_request(dec!(50.00));
        let first = h.orchestrator.authorize(request.clone(), None).await.unwrap();
        let second = h.orchestrator.authorize(request, None).await.unwrap();
        assert_eq!(first.decision_id, second.decision_id);
    }

    #[tokio::test]
    async fn high_risk_request_is_challenged_then_approved_on_success() {
        let h = harness(dec!(10000.00)).await;
        let decision = h.orchestrator.authorize(challenge_request(), None).await.unwrap();
        assert_eq!(decision.decision, Decision::Challenge);
        assert_eq!(decision.reason_code, ReasonCode::AdditionalAuthenticationRequired);

        let card = h
            .card_directory
            .lookup_by_pan_hash("hash-1")
            .await
            .unwrap();
        let completed = h
            .orchestrator
            .challenge_complete(decision.request_id, card, "SUCCESS", Utc::now())
            .await
            .unwrap();
        assert_eq!(completed.decision, Decision::Approved);
        assert!(completed.hold_id.is_some());
    }

    #[tokio::test]
    async fn challenge_success_still_declines_if_funds_ran_out_while_waiting() {
        let h = harness(dec!(10000.00)).await;
        let decision = h.orchestrator.authorize(challenge_request(), None).await.unwrap();
        assert_eq!(decision.decision, Decision::Challenge);

        // Something else reserves the rest of the balance while the
        // cardholder is completing the challenge.
        h.ledger
            .reserve(h.account_id, Money::new(dec!(9900.00), Currency::USD), RequestId::new())
            .await
            .unwrap();

        let card = h
            .card_directory
            .lookup_by_pan_hash("hash-1")
            .await
            .unwrap();
        let completed = h
            .orchestrator
            .challenge_complete(decision.request_id, card, "SUCCESS", Utc::now())
            .await
            .unwrap();
        assert_eq!(completed.decision, Decision::Declined);
        assert_eq!(completed.reason_code, ReasonCode::InsufficientFunds);
        assert!(completed.hold_id.is_none());
        // The CHALLENGE row was folded in place via `update`, not
        // superseded by a second row for the same requestId.
        assert_eq!(completed.decision_id, decision.decision_id);
    }

    #[tokio::test]
    async fn challenge_failure_declines_with_security_violation() {
        let h = harness(dec!(10000.00)).await;
        let decision = h.orchestrator.authorize(challenge_request(), None).await.unwrap();
        let card = h
            .card_directory
            .lookup_by_pan_hash("hash-1")
            .await
            .unwrap();
        let completed = h
            .orchestrator
            .challenge_complete(decision.request_id, card, "FAILURE", Utc::now())
            .await
            .unwrap();
        assert_eq!(completed.decision, Decision::Declined);
        assert_eq!(completed.reason_code, ReasonCode::SecurityViolation);

        // A failed challenge is still a terminal outcome for the request.
        let persisted_request = h.requests.find_by_id(decision.request_id).await.unwrap().unwrap();
        assert!(persisted_request.processed);
    }

    #[tokio::test]
    async fn reversal_releases_the_hold_and_marks_the_decision_reversed() {
        let h = harness(dec!(10000.00)).await;
        let request = clean_request(dec!(200.00));
        let decision = h.orchestrator.authorize(request, None).await.unwrap();
        assert_eq!(decision.decision, Decision::Approved);

        let card = h
            .card_directory
            .lookup_by_pan_hash("hash-1")
            .await
            .unwrap();
        let reversed = h
            .orchestrator
            .reverse_authorization(decision.request_id, &card, Channel::Pos, "merchant requested void", Utc::now())
            .await
            .unwrap();
        assert_eq!(reversed.decision, Decision::Declined);
        assert_eq!(reversed.reason_code, ReasonCode::AuthorizationReversed);
        assert!(reversed.approved_amount.is_zero());
        assert!(reversed.reason_message.contains("merchant requested void"));

        let again = h
            .orchestrator
            .reverse_authorization(decision.request_id, &card, Channel::Pos, "merchant requested void", Utc::now())
            .await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn reversal_of_an_unknown_request_is_not_found() {
        let h = harness(dec!(10000.00)).await;
        let card = CardDetails {
            card_id: CardId::new(),
            status: CardStatus::Active,
            expiry: ExpiryDate { month: 12, year: 2099 },
            issuer_country: Some("US".to_string()),
            three_ds_enrollment_status: Some("Y".to_string()),
            account_id: h.account_id,
            account_space_id: None,
            account_currency: Currency::USD,
            product_code: None,
            limit_tiers: vec![],
        };
        let result = h
            .orchestrator
            .reverse_authorization(RequestId::new(), &card, Channel::Pos, "merchant requested void", Utc::now())
            .await;
        assert!(matches!(result, Err(OrchestratorError::NotFound(_))));
    }
}


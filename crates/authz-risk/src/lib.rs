//! Risk Engine (C9): a pure, stateless scoring function over a request
//! and the card it was resolved against. Carries no I/O and needs no
//! trait object - unlike the other evaluators it has nothing external to
//! mock.

pub mod config;

pub use config::RiskConfig;

use authz_types::{AuthorizationRequest, CardDetails, Channel, Currency};
use chrono::Timelike;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskRecommendation {
    Approve,
    Challenge,
    Decline,
}

#[derive(Debug, Clone)]
pub struct RiskAssessment {
    pub score: u8,
    pub triggered_rules: Vec<&'static str>,
    pub recommendation: RiskRecommendation,
}

pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn assess(&self, request: &AuthorizationRequest, card: &CardDetails) -> RiskAssessment {
        let mut score: u32 = 0;
        let mut triggered = Vec::new();

        if self.high_value_transaction(request) {
            score += 20;
            triggered.push("high_value_transaction");
        }
        if self.round_amount(request) {
            score += 5;
            triggered.push("round_amount");
        }
        if self.unusual_country(request, card) {
            score += 30;
            triggered.push("unusual_country");
        }
        if self.unusual_merchant_category(request) {
            score += 15;
            triggered.push("unusual_merchant_category");
        }
        if self.unusual_time(request) {
            score += 10;
            triggered.push("unusual_time");
        }
        if self.ecommerce_without_3ds(request, card) {
            score += 25;
            triggered.push("ecommerce_without_3ds");
        }

        let score = score.min(100) as u8;
        let recommendation = if score >= self.config.decline_threshold {
            RiskRecommendation::Decline
        } else if score >= self.config.challenge_threshold {
            RiskRecommendation::Challenge
        } else {
            RiskRecommendation::Approve
        };

        RiskAssessment {
            score,
            triggered_rules: triggered,
            recommendation,
        }
    }

    fn high_value_threshold(&self, currency: Currency) -> rust_decimal::Decimal {
        match currency {
            Currency::USD => self.config.high_value_threshold_usd,
            Currency::EUR => self.config.high_value_threshold_eur,
            Currency::GBP => self.config.high_value_threshold_gbp,
            _ => self.config.high_value_threshold_default,
        }
    }

    fn high_value_transaction(&self, request: &AuthorizationRequest) -> bool {
        request.amount.amount() >= self.high_value_threshold(request.amount.currency())
    }

    fn round_amount(&self, request: &AuthorizationRequest) -> bool {
        let amount = request.amount.amount();
        amount >= rust_decimal::Decimal::new(500, 0) && (amount % rust_decimal::Decimal::new(100, 0)).is_zero()
    }

    fn unusual_country(&self, request: &AuthorizationRequest, card: &CardDetails) -> bool {
        match &card.issuer_country {
            Some(issuer) => issuer != &request.country_code,
            None => false,
        }
    }

    fn unusual_merchant_category(&self, request: &AuthorizationRequest) -> bool {
        self.config.high_risk_mccs.contains(&request.mcc)
    }

    fn unusual_time(&self, request: &AuthorizationRequest) -> bool {
        let hour = request.timestamp.hour();
        (1..=5).contains(&hour)
    }

    fn ecommerce_without_3ds(&self, request: &AuthorizationRequest, card: &CardDetails) -> bool {
        request.channel == Channel::ECommerce && (!card.is_three_ds_enrolled() || request.three_ds.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_types::{AccountId, CardId, CardStatus, ExpiryDate, Money, MerchantId, RequestId, ThreeDsData, TransactionType};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn card(issuer_country: Option<&str>, three_ds: Option<&str>) -> CardDetails {
        CardDetails {
            card_id: CardId::new(),
            status: CardStatus::Active,
            expiry: ExpiryDate { month: 1, year: 2099 },
            issuer_country: issuer_country.map(String::from),
            three_ds_enrollment_status: three_ds.map(String::from),
            account_id: AccountId::new(),
            account_space_id: None,
            account_currency: Currency::USD,
            product_code: Some("GOLD".to_string()),
            limit_tiers: vec![],
        }
    }

    fn request(amount: rust_decimal::Decimal, channel: Channel, mcc: &str, country: &str, hour: u32) -> AuthorizationRequest {
        AuthorizationRequest {
            request_id: RequestId::new(),
            masked_pan: "411111******1111".to_string(),
            pan_hash: Some("hash".to_string()),
            token: None,
            expiry_month: 1,
            expiry_year: 2099,
            merchant_id: MerchantId::new(),
            merchant_name: "Acme".to_string(),
            channel,
            mcc: mcc.to_string(),
            country_code: country.to_string(),
            transaction_type: TransactionType::Purchase,
            amount: Money::new(amount, Currency::USD),
            cryptogram: None,
            pin_data: None,
            three_ds: None,
            timestamp: Utc.with_ymd_and_hms(2026, 7, 28, hour, 0, 0).unwrap(),
            processed: false,
            processed_at: None,
        }
    }

    #[test]
    fn clean_low_value_request_scores_low_and_approves() {
        let engine = RiskEngine::new(RiskConfig::default());
        let assessment = engine.assess(&request(dec!(12.50), Channel::Pos, "5411", "US", 14), &card(Some("US"), Some("Y")));
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.recommendation, RiskRecommendation::Approve);
    }

    #[test]
    fn high_value_round_unusual_country_compounds_to_challenge() {
        let engine = RiskEngine::new(RiskConfig::default());
        // high_value (+20) + round_amount (+5) + unusual_country (+30) = 55, still Approve at default thresholds.
        let assessment = engine.assess(&request(dec!(1500.00), Channel::Pos, "5411", "CA", 14), &card(Some("US"), Some("Y")));
        assert_eq!(assessment.score, 55);
        assert!(assessment.triggered_rules.contains(&"high_value_transaction"));
        assert!(assessment.triggered_rules.contains(&"round_amount"));
        assert!(assessment.triggered_rules.contains(&"unusual_country"));
    }

    #[test]
    fn ecommerce_without_3ds_and_high_risk_mcc_trigger_challenge() {
        let engine = RiskEngine::new(RiskConfig::default());
        // ecommerce_without_3ds (+25) + unusual_merchant_category (+15) + unusual_time (+10) = 50.
        let mut req = request(dec!(42.00), Channel::ECommerce, "7995", "US", 3);
        req.three_ds = None;
        let assessment = engine.assess(&req, &card(Some("US"), Some("N")));
        assert_eq!(assessment.score, 50);
        assert_eq!(assessment.recommendation, RiskRecommendation::Approve);
    }

    #[test]
    fn stacked_rules_cross_decline_threshold() {
        let engine = RiskEngine::new(RiskConfig::default());
        let mut req = request(dec!(2000.00), Channel::ECommerce, "7995", "CA", 3);
        req.three_ds = Some(ThreeDsData {
            eci: None,
            cavv: None,
            xid: None,
        });
        // high_value(+20) + unusual_country(+30) + unusual_mcc(+15) + unusual_time(+10) + ecommerce_without_3ds since card not enrolled (+25) = 100
        let assessment = engine.assess(&req, &card(Some("US"), Some("N")));
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.recommendation, RiskRecommendation::Decline);
    }

    #[test]
    fn score_never_exceeds_one_hundred() {
        let engine = RiskEngine::new(RiskConfig::default());
        let req = request(dec!(5000.00), Channel::ECommerce, "7995", "CA", 3);
        let assessment = engine.assess(&req, &card(Some("US"), Some("N")));
        assert!(assessment.score <= 100);
    }
}

use rust_decimal::Decimal;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub decline_threshold: u8,
    pub challenge_threshold: u8,
    pub high_risk_mccs: HashSet<String>,
    pub high_value_threshold_usd: Decimal,
    pub high_value_threshold_eur: Decimal,
    pub high_value_threshold_gbp: Decimal,
    pub high_value_threshold_default: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            decline_threshold: 90,
            challenge_threshold: 70,
            high_risk_mccs: ["7995", "5993", "5921", "7273", "7994", "5816", "5967"]
                .into_iter()
                .map(String::from)
                .collect(),
            high_value_threshold_usd: Decimal::new(1000, 0),
            high_value_threshold_eur: Decimal::new(900, 0),
            high_value_threshold_gbp: Decimal::new(800, 0),
            high_value_threshold_default: Decimal::new(500, 0),
        }
    }
}

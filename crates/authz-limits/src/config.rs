use authz_types::Channel;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;

/// Per-channel multipliers applied to the effective transaction/daily
/// limit before it is checked.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    factors: HashMap<Channel, Decimal>,
    default_factor: Decimal,
}

impl LimitsConfig {
    /// Build from the three configured channel multipliers
    /// (`channelMultipliers.{atm,ecommerce,pos}`); every other channel
    /// falls back to a 1.0 factor.
    pub fn new(atm: Decimal, ecommerce: Decimal, pos: Decimal) -> Self {
        let mut factors = HashMap::new();
        factors.insert(Channel::Atm, atm);
        factors.insert(Channel::ECommerce, ecommerce);
        factors.insert(Channel::Pos, pos);
        Self {
            factors,
            default_factor: Decimal::ONE,
        }
    }

    pub fn factor_for(&self, channel: Channel) -> Decimal {
        self.factors.get(&channel).copied().unwrap_or(self.default_factor)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let mut factors = HashMap::new();
        factors.insert(Channel::Atm, Decimal::from_f64(0.5).unwrap());
        factors.insert(Channel::ECommerce, Decimal::from_f64(0.75).unwrap());
        factors.insert(Channel::Pos, Decimal::ONE);
        Self {
            factors,
            default_factor: Decimal::ONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_channel_falls_back_to_default_factor() {
        let config = LimitsConfig::default();
        assert_eq!(config.factor_for(Channel::MobileApp), Decimal::ONE);
        assert_eq!(config.factor_for(Channel::Atm), Decimal::from_f64(0.5).unwrap());
    }
}

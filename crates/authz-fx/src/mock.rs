//! A static in-memory rate table, used by tests and by the reference
//! deployment until a live rate feed is wired in.

use crate::{Fx, FxError};
use async_trait::async_trait;
use authz_types::Currency;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct StaticFxProvider {
    rates: RwLock<HashMap<(Currency, Currency), Decimal>>,
}

impl StaticFxProvider {
    pub fn new() -> Self {
        Self {
            rates: RwLock::new(HashMap::new()),
        }
    }

    /// Register a rate for `from -> to`. Does not implicitly register the
    /// inverse pair; callers seed both directions if both are needed.
    pub fn set_rate(&self, from: Currency, to: Currency, rate: Decimal) {
        self.rates.write().unwrap().insert((from, to), rate);
    }
}

impl Default for StaticFxProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fx for StaticFxProvider {
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, FxError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .read()
            .unwrap()
            .get(&(from, to))
            .copied()
            .ok_or(FxError::PairUnavailable { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn identity_pair_is_always_one() {
        let fx = StaticFxProvider::new();
        assert_eq!(fx.rate(Currency::USD, Currency::USD).await.unwrap(), Decimal::ONE);
    }

    #[tokio::test]
    async fn unregistered_pair_is_unavailable() {
        let fx = StaticFxProvider::new();
        assert!(fx.rate(Currency::USD, Currency::EUR).await.is_err());
    }

    #[tokio::test]
    async fn registered_pair_returns_its_rate() {
        let fx = StaticFxProvider::new();
        fx.set_rate(Currency::EUR, Currency::USD, dec!(1.08455));
        assert_eq!(fx.rate(Currency::EUR, Currency::USD).await.unwrap(), dec!(1.08455));
    }
}

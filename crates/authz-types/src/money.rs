//! Fixed-point money: a `rust_decimal::Decimal` amount tagged with an
//! ISO-4217 currency code, always carried at 4 fractional digits per the
//! specification.

use rust_decimal::prelude::*;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of fractional digits every `Money` value is normalized to.
pub const SCALE: u32 = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency code must be 3 uppercase ASCII letters, got {0:?}")]
    InvalidCurrencyCode(String),
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount overflow")]
    Overflow,
}

/// An ISO-4217 three-letter currency code (e.g. `USD`, `EUR`, `GBP`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency([u8; 3]);

impl Currency {
    pub const USD: Currency = Currency([b'U', b'S', b'D']);
    pub const EUR: Currency = Currency([b'E', b'U', b'R']);
    pub const GBP: Currency = Currency([b'G', b'B', b'P']);

    pub fn parse(code: &str) -> Result<Self, MoneyError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(MoneyError::InvalidCurrencyCode(code.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Currency {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let code = String::deserialize(d)?;
        Currency::parse(&code).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Money {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        MoneyShadow {
            amount: self.amount,
            currency: self.currency,
        }
        .serialize(s)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let shadow = MoneyShadow::deserialize(d)?;
        Ok(Money::new(shadow.amount, shadow.currency))
    }
}

#[derive(Serialize, Deserialize)]
struct MoneyShadow {
    amount: Decimal,
    currency: Currency,
}

/// A monetary amount, always normalized to [`SCALE`] (4) fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero),
            currency,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn require_positive(&self) -> Result<(), MoneyError> {
        if self.is_positive() {
            Ok(())
        } else {
            Err(MoneyError::NotPositive)
        }
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount
            .checked_add(other.amount)
            .map(|v| Money::new(v, self.currency))
    }

    /// Subtraction clamped at zero - used for reversal bookkeeping where
    /// spentAmount must never go negative.
    pub fn saturating_sub(&self, other: Money) -> Money {
        let result = self.amount - other.amount;
        Money::new(result.max(Decimal::ZERO), self.currency)
    }

    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount
            .checked_sub(other.amount)
            .map(|v| Money::new(v, self.currency))
    }

    /// Multiply by a rate and round HALF_UP to [`SCALE`] digits, as used
    /// by FX conversion in the balance checker.
    pub fn convert(&self, rate: Decimal, target: Currency) -> Money {
        let converted = (self.amount * rate).round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        Money::new(converted, target)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn normalizes_to_four_decimals() {
        let m = Money::new(dec!(10.123456), Currency::USD);
        assert_eq!(m.amount(), dec!(10.1235));
    }

    #[test]
    fn saturating_sub_never_negative() {
        let a = Money::new(dec!(10.00), Currency::USD);
        let b = Money::new(dec!(25.00), Currency::USD);
        assert_eq!(a.saturating_sub(b).amount(), Decimal::ZERO);
    }

    #[test]
    fn convert_rounds_half_up() {
        let m = Money::new(dec!(100.00), Currency::EUR);
        let converted = m.convert(dec!(1.08455), Currency::USD);
        assert_eq!(converted.amount(), dec!(108.4550));
    }

    #[test]
    fn currency_rejects_bad_codes() {
        assert!(Currency::parse("US").is_err());
        assert!(Currency::parse("usd").is_err());
        assert!(Currency::parse("USD").is_ok());
    }
}

//! FX rate contract (C3): the exchange rate collaborator the balance
//! checker (C10) consults when a hold's reserve currency differs from the
//! account's settlement currency.

pub mod error;
pub mod mock;

pub use error::FxError;

use async_trait::async_trait;
use authz_types::Currency;
use rust_decimal::Decimal;

/// A source of spot exchange rates. Implementations may be a static table
/// (tests, demos) or a live rate feed; the orchestrator only ever sees
/// this trait object.
#[async_trait]
pub trait Fx: Send + Sync {
    /// The rate to multiply an amount in `from` by to get an amount in
    /// `to`. Implementations return `Decimal::ONE` when `from == to`
    /// rather than requiring every identity pair to be pre-populated.
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, FxError>;
}

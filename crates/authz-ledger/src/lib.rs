//! authz-ledger - the ledger contract (C2).
//!
//! An account's available balance is its ledger balance minus whatever
//! is currently on hold. `reserve`/`release`/`post` are the three moves
//! the hold manager drives an account through: reserve when a hold is
//! created, release when it's released or expires, post when a hold is
//! captured (a release of the unused portion plus a permanent debit of
//! the captured portion).

pub mod error;
pub mod http_client;
pub mod mock;

pub use error::LedgerError;
pub use http_client::HttpLedgerClient;
pub use mock::InMemoryLedger;

use async_trait::async_trait;
use authz_types::{AccountId, Money, RequestId};

#[derive(Debug, Clone, Copy)]
pub struct LedgerBalances {
    pub ledger_balance: Money,
    pub reserved: Money,
}

impl LedgerBalances {
    pub fn available(&self) -> Money {
        self.ledger_balance.saturating_sub(self.reserved)
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn balances(&self, account_id: AccountId) -> Result<LedgerBalances, LedgerError>;

    /// Move `amount` from available into the reserved bucket. Fails if
    /// available funds are insufficient.
    async fn reserve(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError>;

    /// Move `amount` back out of the reserved bucket without touching
    /// the ledger balance (hold released or expired unused).
    async fn release(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError>;

    /// Permanently debit `amount` from the ledger balance and remove it
    /// from the reserved bucket (hold captured).
    async fn post(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError>;
}

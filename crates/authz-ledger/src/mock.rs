//! In-memory ledger, one account state per [`AccountId`], guarded by a
//! single [`RwLock`] over the account map so reserve/release/post are
//! each atomic with respect to concurrent requests on the same account.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use authz_types::{AccountId, Currency, Money, RequestId};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{error::LedgerError, Ledger, LedgerBalances};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryType {
    Reserve,
    Release,
    Post,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    account_id: AccountId,
    entry_type: EntryType,
    amount: Money,
    correlation_id: RequestId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct AccountState {
    ledger_balance: Money,
    reserved: Money,
}

#[derive(Clone)]
pub struct InMemoryLedger {
    accounts: Arc<RwLock<HashMap<AccountId, AccountState>>>,
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(HashMap::new())),
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Seed an account with an initial ledger balance. Test/bootstrap
    /// only - a real deployment's ledger is fed by the core banking
    /// system, not by this crate.
    pub async fn seed(&self, account_id: AccountId, balance: Money) {
        self.accounts.write().await.insert(
            account_id,
            AccountState {
                ledger_balance: balance,
                reserved: Money::zero(balance.currency()),
            },
        );
    }

    fn record(&self, entries: &mut Vec<LedgerEntry>, account_id: AccountId, entry_type: EntryType, amount: Money, correlation_id: RequestId) {
        entries.push(LedgerEntry {
            account_id,
            entry_type,
            amount,
            correlation_id,
            created_at: Utc::now(),
        });
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn balances(&self, account_id: AccountId) -> Result<LedgerBalances, LedgerError> {
        let accounts = self.accounts.read().await;
        let state = accounts
            .get(&account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        Ok(LedgerBalances {
            ledger_balance: state.ledger_balance,
            reserved: state.reserved,
        })
    }

    async fn reserve(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(&account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        require_same_currency(state.ledger_balance.currency(), amount.currency())?;

        let available = state.ledger_balance.saturating_sub(state.reserved);
        if available.amount() < amount.amount() {
            return Err(LedgerError::InsufficientAvailable {
                available: available.to_string(),
                required: amount.to_string(),
            });
        }
        state.reserved = state
            .reserved
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Unavailable("reserved amount overflow".to_string()))?;

        let mut entries = self.entries.write().await;
        self.record(&mut entries, account_id, EntryType::Reserve, amount, correlation_id);
        Ok(())
    }

    async fn release(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(&account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        require_same_currency(state.ledger_balance.currency(), amount.currency())?;

        if state.reserved.amount() < amount.amount() {
            return Err(LedgerError::ReservedUnderflow(account_id.to_string()));
        }
        state.reserved = state.reserved.saturating_sub(amount);

        let mut entries = self.entries.write().await;
        self.record(&mut entries, account_id, EntryType::Release, amount, correlation_id);
        Ok(())
    }

    async fn post(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(&account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        require_same_currency(state.ledger_balance.currency(), amount.currency())?;

        if state.reserved.amount() < amount.amount() {
            return Err(LedgerError::ReservedUnderflow(account_id.to_string()));
        }
        state.reserved = state.reserved.saturating_sub(amount);
        state.ledger_balance = state.ledger_balance.saturating_sub(amount);

        let mut entries = self.entries.write().await;
        self.record(&mut entries, account_id, EntryType::Post, amount, correlation_id);
        Ok(())
    }
}

fn require_same_currency(a: Currency, b: Currency) -> Result<(), LedgerError> {
    if a.as_str() != b.as_str() {
        return Err(LedgerError::CurrencyMismatch);
    }
    Ok(())
}

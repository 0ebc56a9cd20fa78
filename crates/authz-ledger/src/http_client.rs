//! HTTP-backed ledger client: the real implementation of the C2 contract
//! against an external ledger service reachable over REST, instead of the
//! in-process [`crate::mock::InMemoryLedger`].
//!
//! Both `services/authz-server` and `services/authz-sweeper` are deployed
//! as independent processes: the sweeper's hold expiry path calls
//! `Ledger::release` on accounts the server reserved against in an
//! entirely separate process, so an in-memory mock can never be shared
//! between them. Pointed at the same `base_url`, this client is how both
//! binaries end up talking to one backing ledger instead of two disjoint
//! ones.

use async_trait::async_trait;
use authz_core::retry::{retry_with_backoff, RetryConfig};
use authz_types::{AccountId, Currency, Money, RequestId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::{Ledger, LedgerBalances};

#[derive(Debug, Serialize)]
struct MoneyWire {
    amount: Decimal,
    currency: Currency,
}

impl From<Money> for MoneyWire {
    fn from(m: Money) -> Self {
        Self { amount: m.amount(), currency: m.currency() }
    }
}

#[derive(Debug, Deserialize)]
struct MoneyResponse {
    amount: Decimal,
    currency: Currency,
}

impl From<MoneyResponse> for Money {
    fn from(m: MoneyResponse) -> Self {
        Money::new(m.amount, m.currency)
    }
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    ledger_balance: MoneyResponse,
    reserved: MoneyResponse,
}

#[derive(Debug, Serialize)]
struct MovementRequest {
    amount: MoneyWire,
    correlation_id: RequestId,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: String,
    message: String,
    #[serde(default)]
    available: Option<String>,
    #[serde(default)]
    required: Option<String>,
}

/// HTTP client for the ledger service, pointing at a single `base_url`
/// shared by every process that needs to reserve, release, or post
/// against the same accounts.
#[derive(Clone)]
pub struct HttpLedgerClient {
    base_url: String,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpLedgerClient {
    pub fn new(base_url: &str, timeout: std::time::Duration, retry: RetryConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder().timeout(timeout).build().expect("ledger http client builds"),
            retry,
        }
    }

    async fn send_movement(&self, path: &str, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError> {
        let body = MovementRequest { amount: amount.into(), correlation_id };
        retry_with_backoff(&self.retry, || async {
            let response = self
                .client
                .post(format!("{}/accounts/{account_id}/{path}", self.base_url))
                .json(&body)
                .send()
                .await
                .map_err(request_error)?;
            read_empty_response(response).await
        })
        .await
    }
}

#[async_trait]
impl Ledger for HttpLedgerClient {
    async fn balances(&self, account_id: AccountId) -> Result<LedgerBalances, LedgerError> {
        retry_with_backoff(&self.retry, || async {
            let response = self
                .client
                .get(format!("{}/accounts/{account_id}/balances", self.base_url))
                .send()
                .await
                .map_err(request_error)?;
            let body: BalancesResponse = read_json_response(response).await?;
            Ok(LedgerBalances {
                ledger_balance: body.ledger_balance.into(),
                reserved: body.reserved.into(),
            })
        })
        .await
    }

    async fn reserve(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError> {
        self.send_movement("reserve", account_id, amount, correlation_id).await
    }

    async fn release(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError> {
        self.send_movement("release", account_id, amount, correlation_id).await
    }

    async fn post(&self, account_id: AccountId, amount: Money, correlation_id: RequestId) -> Result<(), LedgerError> {
        self.send_movement("post", account_id, amount, correlation_id).await
    }
}

fn request_error(err: reqwest::Error) -> LedgerError {
    LedgerError::Unavailable(err.to_string())
}

async fn read_empty_response(response: reqwest::Response) -> Result<(), LedgerError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(classify_error_response(response).await)
}

async fn read_json_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, LedgerError> {
    if !response.status().is_success() {
        return Err(classify_error_response(response).await);
    }
    response.json().await.map_err(request_error)
}

async fn classify_error_response(response: reqwest::Response) -> LedgerError {
    let status = response.status();
    let body: ErrorResponse = response.json().await.unwrap_or(ErrorResponse {
        code: "UNKNOWN".to_string(),
        message: status.to_string(),
        available: None,
        required: None,
    });
    match body.code.as_str() {
        "ACCOUNT_NOT_FOUND" => LedgerError::AccountNotFound(body.message),
        "INSUFFICIENT_AVAILABLE" => LedgerError::InsufficientAvailable {
            available: body.available.unwrap_or_else(|| "unknown".to_string()),
            required: body.required.unwrap_or(body.message),
        },
        "RESERVED_UNDERFLOW" => LedgerError::ReservedUnderflow(body.message),
        "CURRENCY_MISMATCH" => LedgerError::CurrencyMismatch,
        _ if status.is_server_error() => LedgerError::Unavailable(body.message),
        _ => LedgerError::Unavailable(body.message),
    }
}

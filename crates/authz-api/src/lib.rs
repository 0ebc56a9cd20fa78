//! authz-api - the HTTP surface over the authorization orchestrator:
//! `/api/v1/authorizations/*` and `/api/v1/holds/*`, plus `/health`/`/ready`
//! probes.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use state::AppState;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api/v1", routes::api_v1_routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_card_directory::mock::InMemoryCardDirectory;
    use authz_card_directory::CardDirectory;
    use authz_db::repos::{DecisionStore, InMemoryDecisionStore, InMemoryRequestStore, RequestStore};
    use authz_fx::mock::StaticFxProvider;
    use authz_holds::{HoldManager, HoldsConfig, InMemoryHoldStore};
    use authz_ledger::{InMemoryLedger, Ledger};
    use authz_limits::{InMemorySpendingWindowStore, LimitsConfig};
    use authz_orchestrator::{AuthorizationOrchestrator, OrchestratorConfig};
    use authz_risk::RiskConfig;
    use authz_types::{AccountId, CardDetails, CardId, CardStatus, Currency, ExpiryDate, LimitScope, LimitTier, Money};
    use axum_test::TestServer;
    use rust_decimal_macros::dec;
    use serde_json::json;

    async fn build_app() -> TestServer {
        let card_directory = Arc::new(InMemoryCardDirectory::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let fx = Arc::new(StaticFxProvider::new());
        let spending_windows = Arc::new(InMemorySpendingWindowStore::new());
        let holds_store = Arc::new(InMemoryHoldStore::new());
        let requests: Arc<dyn RequestStore> = Arc::new(InMemoryRequestStore::new());
        let decisions: Arc<dyn DecisionStore> = Arc::new(InMemoryDecisionStore::new());

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
        ledger.seed(account_id, Money::new(dec!(10000.00), Currency::USD)).await;

        let holds = Arc::new(HoldManager::new(holds_store.clone(), ledger.clone(), HoldsConfig::default()));
        let orchestrator = Arc::new(AuthorizationOrchestrator::new(
            card_directory.clone() as Arc<dyn CardDirectory>,
            ledger as Arc<dyn Ledger>,
            fx,
            spending_windows,
            holds_store,
            requests.clone(),
            decisions.clone(),
            LimitsConfig::default(),
            RiskConfig::default(),
            HoldsConfig::default(),
            OrchestratorConfig::default(),
        ));

        let state = Arc::new(AppState::new(
            orchestrator,
            holds,
            requests,
            decisions,
            card_directory as Arc<dyn CardDirectory>,
        ));
        TestServer::new(create_router(state)).unwrap()
    }

    #[tokio::test]
    async fn create_authorization_approves_a_well_formed_request() {
        let server = build_app().await;
        let response = server
            .post("/api/v1/authorizations")
            .json(&json!({
                "maskedPan": "411111******1111",
                "panHash": "hash-1",
                "expiryMonth": 12,
                "expiryYear": 2099,
                "merchantId": 1,
                "merchantName": "Acme",
                "channel": "POS",
                "mcc": "5411",
                "countryCode": "US",
                "transactionType": "PURCHASE",
                "amount": {"amount": "125.50", "currency": "USD"},
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["decision"], "APPROVED");
        assert_eq!(body["reasonCode"], "00");
    }

    #[tokio::test]
    async fn missing_card_reference_is_a_bad_request() {
        let server = build_app().await;
        let response = server
            .post("/api/v1/authorizations")
            .json(&json!({
                "maskedPan": "411111******1111",
                "expiryMonth": 12,
                "expiryYear": 2099,
                "merchantId": 1,
                "merchantName": "Acme",
                "channel": "POS",
                "mcc": "5411",
                "countryCode": "US",
                "transactionType": "PURCHASE",
                "amount": {"amount": "125.50", "currency": "USD"},
            }))
            .await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn unknown_decision_id_is_not_found() {
        let server = build_app().await;
        let response = server.get("/api/v1/authorizations/99999999").await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn health_and_ready_probes_respond() {
        let server = build_app().await;
        server.get("/health").await.assert_status_ok();
        server.get("/ready").await.assert_status_ok();
    }
}

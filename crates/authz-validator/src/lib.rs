//! Card Validator (C7): resolves the card referenced by a request and
//! checks status/expiry before any other evaluator runs.

pub mod error;

pub use error::ValidatorError;

use authz_card_directory::CardDirectory;
use authz_types::{AuthorizationRequest, CardDetails, CardStatus};
use chrono::{Datelike, Utc};
use std::sync::Arc;

pub struct CardValidator {
    directory: Arc<dyn CardDirectory>,
}

impl CardValidator {
    pub fn new(directory: Arc<dyn CardDirectory>) -> Self {
        Self { directory }
    }

    /// Resolves the card referenced by `request` (panHash first, then
    /// token) and checks it is usable. Has no side effects: it only
    /// reads from the card directory.
    pub async fn validate(&self, request: &AuthorizationRequest) -> Result<CardDetails, ValidatorError> {
        let card = if let Some(pan_hash) = &request.pan_hash {
            self.directory.lookup_by_pan_hash(pan_hash).await?
        } else if let Some(token) = &request.token {
            self.directory.lookup_by_token(token).await?
        } else {
            return Err(ValidatorError::MissingCardReference);
        };

        self.check_status(&card)?;
        self.check_expiry(&card)?;
        Ok(card)
    }

    fn check_status(&self, card: &CardDetails) -> Result<(), ValidatorError> {
        match card.status {
            CardStatus::Active => Ok(()),
            CardStatus::Expired => Err(ValidatorError::ExpiredCard),
            CardStatus::Lost | CardStatus::Stolen => Err(ValidatorError::CardLostStolen),
            CardStatus::Inactive | CardStatus::Restricted => Err(ValidatorError::CardNotActive),
        }
    }

    fn check_expiry(&self, card: &CardDetails) -> Result<(), ValidatorError> {
        let now = Utc::now();
        let today = (now.year(), now.month());
        let expiry = (card.expiry.year as i32, card.expiry.month as u32);
        if expiry < today {
            return Err(ValidatorError::ExpiredCard);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz_card_directory::mock::InMemoryCardDirectory;
    use authz_types::{AccountId, CardId, ExpiryDate};
    use chrono::Utc;

    fn sample_card(status: CardStatus, year: i32, month: u32) -> CardDetails {
        CardDetails {
            card_id: CardId::new(),
            status,
            expiry: ExpiryDate {
                month: month as u8,
                year: year as u16,
            },
            issuer_country: Some("US".to_string()),
            three_ds_enrollment_status: Some("Y".to_string()),
            account_id: AccountId::new(),
            account_space_id: None,
            account_currency: authz_types::Currency::USD,
            product_code: Some("GOLD".to_string()),
            limit_tiers: Vec::new(),
        }
    }

    fn request_with_pan_hash(pan_hash: &str) -> AuthorizationRequest {
        let mut req = test_request();
        req.pan_hash = Some(pan_hash.to_string());
        req.token = None;
        req
    }

    fn test_request() -> AuthorizationRequest {
        use authz_types::{Channel, Money, RequestId, TransactionType};
        use rust_decimal_macros::dec;
        AuthorizationRequest {
            request_id: RequestId::new(),
            masked_pan: "411111******1111".to_string(),
            pan_hash: Some("hash-1".to_string()),
            token: None,
            expiry_month: 1,
            expiry_year: 2099,
            merchant_id: authz_types::MerchantId::new(),
            merchant_name: "Acme".to_string(),
            channel: Channel::Pos,
            mcc: "5411".to_string(),
            country_code: "US".to_string(),
            transaction_type: TransactionType::Purchase,
            amount: Money::new(dec!(10.00), authz_types::Currency::USD),
            cryptogram: None,
            pin_data: None,
            three_ds: None,
            timestamp: Utc::now(),
            processed: false,
            processed_at: None,
        }
    }

    #[tokio::test]
    async fn active_non_expired_card_passes() {
        let dir = InMemoryCardDirectory::new();
        let current_year = Utc::now().year();
        dir.register(Some("hash-1"), None, sample_card(CardStatus::Active, current_year + 1, 1))
            .await;
        let validator = CardValidator::new(Arc::new(dir));
        let result = validator.validate(&request_with_pan_hash("hash-1")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn expired_status_is_rejected() {
        let dir = InMemoryCardDirectory::new();
        dir.register(Some("hash-1"), None, sample_card(CardStatus::Expired, 2020, 1))
            .await;
        let validator = CardValidator::new(Arc::new(dir));
        let err = validator.validate(&request_with_pan_hash("hash-1")).await.unwrap_err();
        assert!(matches!(err, ValidatorError::ExpiredCard));
    }

    #[tokio::test]
    async fn lost_or_stolen_is_rejected_distinctly() {
        let dir = InMemoryCardDirectory::new();
        let current_year = Utc::now().year();
        dir.register(Some("hash-1"), None, sample_card(CardStatus::Stolen, current_year + 1, 1))
            .await;
        let validator = CardValidator::new(Arc::new(dir));
        let err = validator.validate(&request_with_pan_hash("hash-1")).await.unwrap_err();
        assert!(matches!(err, ValidatorError::CardLostStolen));
    }

    #[tokio::test]
    async fn restricted_status_maps_to_not_active() {
        let dir = InMemoryCardDirectory::new();
        let current_year = Utc::now().year();
        dir.register(
            Some("hash-1"),
            None,
            sample_card(CardStatus::Restricted, current_year + 1, 1),
        )
        .await;
        let validator = CardValidator::new(Arc::new(dir));
        let err = validator.validate(&request_with_pan_hash("hash-1")).await.unwrap_err();
        assert!(matches!(err, ValidatorError::CardNotActive));
    }

    #[tokio::test]
    async fn missing_card_reference_fails_fast() {
        let dir = InMemoryCardDirectory::new();
        let validator = CardValidator::new(Arc::new(dir));
        let mut req = test_request();
        req.pan_hash = None;
        req.token = None;
        let err = validator.validate(&req).await.unwrap_err();
        assert!(matches!(err, ValidatorError::MissingCardReference));
    }
}

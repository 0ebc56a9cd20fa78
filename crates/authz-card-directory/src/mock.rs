//! In-memory card directory, keyed by panHash and by token.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use authz_types::CardDetails;
use tokio::sync::RwLock;

use crate::{CardDirectory, CardDirectoryError};

#[derive(Clone, Default)]
pub struct InMemoryCardDirectory {
    by_pan_hash: Arc<RwLock<HashMap<String, CardDetails>>>,
    by_token: Arc<RwLock<HashMap<String, CardDetails>>>,
}

impl InMemoryCardDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card under both lookup keys it's reachable by. Tests
    /// and seed data use this directly; a real deployment's client never
    /// would.
    pub async fn register(&self, pan_hash: Option<&str>, token: Option<&str>, card: CardDetails) {
        if let Some(hash) = pan_hash {
            self.by_pan_hash.write().await.insert(hash.to_string(), card.clone());
        }
        if let Some(tok) = token {
            self.by_token.write().await.insert(tok.to_string(), card);
        }
    }
}

#[async_trait]
impl CardDirectory for InMemoryCardDirectory {
    async fn lookup_by_pan_hash(&self, pan_hash: &str) -> Result<CardDetails, CardDirectoryError> {
        self.by_pan_hash
            .read()
            .await
            .get(pan_hash)
            .cloned()
            .ok_or(CardDirectoryError::CardNotFound)
    }

    async fn lookup_by_token(&self, token: &str) -> Result<CardDetails, CardDirectoryError> {
        self.by_token
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(CardDirectoryError::CardNotFound)
    }
}

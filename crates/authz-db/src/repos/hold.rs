//! Postgres-backed [`authz_holds::HoldStore`]: every transition is a
//! single `UPDATE ... WHERE status = 'ACTIVE' RETURNING *`, the same
//! compare-and-swap idiom as `openibank-db::repos::withdrawal::approve`.
//! No application-level locking is needed here beyond that - the hold
//! manager's per-holdId [`authz_core::KeyedLock`] already serializes
//! calls within one process, and the `WHERE status = 'ACTIVE'` guard
//! makes a concurrent racing writer (another replica) a no-op instead of
//! a lost update.

use crate::models::DbHold;
use async_trait::async_trait;
use authz_holds::{HoldStore, HoldsError};
use authz_types::{AccountId, AuthorizationHold, HoldId, HoldStatus, Money};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PgHoldStore {
    pool: PgPool,
}

impl PgHoldStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: impl std::fmt::Display) -> HoldsError {
    HoldsError::Store(e.to_string())
}

fn status_to_column(status: HoldStatus) -> Result<String, HoldsError> {
    match serde_json::to_value(status).map_err(store_err)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(store_err(format!("expected string-like status, got {other}"))),
    }
}

#[async_trait]
impl HoldStore for PgHoldStore {
    async fn insert(&self, hold: AuthorizationHold) -> Result<(), HoldsError> {
        let row = DbHold::try_from(&hold).map_err(store_err)?;
        sqlx::query(
            r#"
            INSERT INTO holds (
                hold_id, request_id, decision_id, account_id, account_space_id, card_id,
                merchant_id, merchant_name, amount, currency, fx_origin, authorization_code,
                status, captured_amount, created_at, updated_at, captured_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(row.hold_id)
        .bind(row.request_id)
        .bind(row.decision_id)
        .bind(row.account_id)
        .bind(row.account_space_id)
        .bind(row.card_id)
        .bind(row.merchant_id)
        .bind(&row.merchant_name)
        .bind(row.amount)
        .bind(&row.currency)
        .bind(&row.fx_origin)
        .bind(&row.authorization_code)
        .bind(&row.status)
        .bind(row.captured_amount)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.captured_at)
        .bind(row.expires_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, hold_id: HoldId) -> Result<AuthorizationHold, HoldsError> {
        let row = sqlx::query_as::<_, DbHold>("SELECT * FROM holds WHERE hold_id = $1")
            .bind(hold_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or(HoldsError::NotFound)?;
        AuthorizationHold::try_from(row).map_err(store_err)
    }

    async fn operation_already_applied(&self, hold_id: HoldId, operation_key: &str) -> Result<bool, HoldsError> {
        let row = sqlx::query("SELECT 1 FROM hold_applied_operations WHERE hold_id = $1 AND operation_key = $2")
            .bind(hold_id.value())
            .bind(operation_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.is_some())
    }

    async fn capture(
        &self,
        hold_id: HoldId,
        capture_amount: Money,
        operation_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let row = sqlx::query_as::<_, DbHold>(
            r#"
            UPDATE holds SET status = 'CAPTURED', captured_amount = $2, captured_at = $3, updated_at = $3
            WHERE hold_id = $1 AND status = 'ACTIVE'
            RETURNING *
            "#,
        )
        .bind(hold_id.value())
        .bind(capture_amount.amount())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?
        .ok_or(HoldsError::InvalidState)?;

        if let Some(key) = operation_key {
            sqlx::query("INSERT INTO hold_applied_operations (hold_id, operation_key) VALUES ($1, $2)")
                .bind(hold_id.value())
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)?;
        AuthorizationHold::try_from(row).map_err(store_err)
    }

    async fn release(
        &self,
        hold_id: HoldId,
        operation_key: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationHold, HoldsError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let row = sqlx::query_as::<_, DbHold>(
            r#"
            UPDATE holds SET status = 'RELEASED', updated_at = $2
            WHERE hold_id = $1 AND status = 'ACTIVE'
            RETURNING *
            "#,
        )
        .bind(hold_id.value())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?
        .ok_or(HoldsError::InvalidState)?;

        if let Some(key) = operation_key {
            sqlx::query("INSERT INTO hold_applied_operations (hold_id, operation_key) VALUES ($1, $2)")
                .bind(hold_id.value())
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)?;
        AuthorizationHold::try_from(row).map_err(store_err)
    }

    async fn expire(&self, hold_id: HoldId, now: DateTime<Utc>) -> Result<AuthorizationHold, HoldsError> {
        let row = sqlx::query_as::<_, DbHold>(
            r#"
            UPDATE holds SET status = 'EXPIRED', updated_at = $2
            WHERE hold_id = $1 AND status = 'ACTIVE'
            RETURNING *
            "#,
        )
        .bind(hold_id.value())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        match row {
            Some(row) => AuthorizationHold::try_from(row).map_err(store_err),
            None => self.get(hold_id).await,
        }
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<AuthorizationHold>, HoldsError> {
        let rows = sqlx::query_as::<_, DbHold>("SELECT * FROM holds WHERE status = 'ACTIVE' AND expires_at < $1")
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter()
            .map(|r| AuthorizationHold::try_from(r).map_err(store_err))
            .collect()
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
        status: Option<HoldStatus>,
    ) -> Result<Vec<AuthorizationHold>, HoldsError> {
        let status_col = status.map(status_to_column).transpose()?;
        let rows = sqlx::query_as::<_, DbHold>(
            r#"
            SELECT * FROM holds
            WHERE account_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id.value())
        .bind(status_col)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter()
            .map(|r| AuthorizationHold::try_from(r).map_err(store_err))
            .collect()
    }
}

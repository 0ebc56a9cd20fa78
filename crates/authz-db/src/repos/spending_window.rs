//! Postgres-backed [`authz_limits::SpendingWindowStore`]. `get_or_create`
//! is a classic upsert (`INSERT ... ON CONFLICT DO NOTHING RETURNING *`,
//! falling back to a `SELECT` on conflict); `apply_delta` takes a
//! `SELECT ... FOR UPDATE` row lock so two concurrent approvals racing on
//! the same card's daily window serialize instead of lost-updating each
//! other's `spentAmount`. The replay guard is keyed on
//! `(window_id, request_id, reverse)`, not just the first two - a
//! reversal reuses the original commit's `request_id`, and without
//! `reverse` in the key it would look like a duplicate of the forward
//! commit and never apply.

use crate::models::{scope_key, DbSpendingWindow};
use async_trait::async_trait;
use authz_limits::{LimitsError, SpendingWindowStore};
use authz_types::{
    period_start_for, AccountId, CardId, Money, RequestId, SpendingWindow, SpendingWindowId, WindowScope, WindowType,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

pub struct PgSpendingWindowStore {
    pool: PgPool,
}

impl PgSpendingWindowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: impl std::fmt::Display) -> LimitsError {
    LimitsError::StoreUnavailable(e.to_string())
}

fn enum_to_column<T: serde::Serialize>(value: &T) -> Result<String, LimitsError> {
    match serde_json::to_value(value).map_err(store_err)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(store_err(format!("expected string-like enum, got {other}"))),
    }
}

#[async_trait]
impl SpendingWindowStore for PgSpendingWindowStore {
    async fn get_or_create(
        &self,
        card_id: CardId,
        account_id: AccountId,
        window_type: WindowType,
        scope: WindowScope,
        period_start: NaiveDate,
        limit_amount: Money,
        now: DateTime<Utc>,
    ) -> Result<SpendingWindow, LimitsError> {
        let period_start = period_start_for(window_type, period_start);
        let key = scope_key(&scope).map_err(store_err)?;
        let window_type_col = enum_to_column(&window_type)?;
        let scope_json = serde_json::to_value(&scope).map_err(store_err)?;

        let inserted = sqlx::query_as::<_, DbSpendingWindow>(
            r#"
            INSERT INTO spending_windows (
                window_id, card_id, account_id, window_type, period_start, scope, scope_key,
                limit_amount, spent_amount, currency, transaction_count, last_transaction_time, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, 0, NULL, $10)
            ON CONFLICT (card_id, window_type, scope_key, period_start) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(SpendingWindowId::new().value())
        .bind(card_id.value())
        .bind(account_id.value())
        .bind(&window_type_col)
        .bind(period_start)
        .bind(&scope_json)
        .bind(&key)
        .bind(limit_amount.amount())
        .bind(limit_amount.currency().as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        let row = match inserted {
            Some(row) => row,
            None => sqlx::query_as::<_, DbSpendingWindow>(
                "SELECT * FROM spending_windows WHERE card_id = $1 AND window_type = $2 AND scope_key = $3 AND period_start = $4",
            )
            .bind(card_id.value())
            .bind(&window_type_col)
            .bind(&key)
            .bind(period_start)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?,
        };
        SpendingWindow::try_from(row).map_err(store_err)
    }

    async fn apply_delta(
        &self,
        window_id: SpendingWindowId,
        request_id: RequestId,
        amount: Money,
        reverse: bool,
        now: DateTime<Utc>,
    ) -> Result<SpendingWindow, LimitsError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let row = sqlx::query_as::<_, DbSpendingWindow>("SELECT * FROM spending_windows WHERE window_id = $1 FOR UPDATE")
            .bind(window_id.value())
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?
            .ok_or_else(|| store_err(format!("unknown window {window_id}")))?;
        let mut window = SpendingWindow::try_from(row).map_err(store_err)?;

        let already_applied = sqlx::query(
            "SELECT 1 FROM spending_window_applied_requests WHERE window_id = $1 AND request_id = $2 AND reverse = $3",
        )
        .bind(window_id.value())
        .bind(request_id.value())
        .bind(reverse)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;

        if already_applied.is_some() {
            tx.commit().await.map_err(store_err)?;
            return Ok(window);
        }

        if reverse {
            window.decrease(amount, now);
        } else {
            window.increase(amount, now);
        }

        sqlx::query(
            r#"
            UPDATE spending_windows SET spent_amount = $2, transaction_count = $3, last_transaction_time = $4, updated_at = $5
            WHERE window_id = $1
            "#,
        )
        .bind(window_id.value())
        .bind(window.spent_amount.amount())
        .bind(window.transaction_count as i64)
        .bind(window.last_transaction_time)
        .bind(window.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        sqlx::query("INSERT INTO spending_window_applied_requests (window_id, request_id, reverse) VALUES ($1, $2, $3)")
            .bind(window_id.value())
            .bind(request_id.value())
            .bind(reverse)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(window)
    }
}

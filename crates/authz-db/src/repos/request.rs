//! Request repository (C6): the idempotency anchor. `insert` is a plain
//! `ON CONFLICT DO NOTHING` since the unique constraint on `request_id`
//! is what gives the orchestrator's `authorize` path its "persist
//! request once" guarantee.

use crate::error::{DbError, DbResult};
use crate::models::DbRequest;
use async_trait::async_trait;
use authz_types::{AuthorizationRequest, RequestId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: &AuthorizationRequest) -> DbResult<()>;
    async fn find_by_id(&self, request_id: RequestId) -> DbResult<Option<AuthorizationRequest>>;
    async fn mark_processed(&self, request_id: RequestId, now: DateTime<Utc>) -> DbResult<()>;
}

pub struct RequestRepo {
    pool: PgPool,
}

impl RequestRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for RequestRepo {
    async fn insert(&self, request: &AuthorizationRequest) -> DbResult<()> {
        let row = DbRequest::try_from(request)?;
        sqlx::query(
            r#"
            INSERT INTO requests (
                request_id, masked_pan, pan_hash, token, expiry_month, expiry_year,
                merchant_id, merchant_name, channel, mcc, country_code, transaction_type,
                amount, currency, cryptogram, pin_data, three_ds, created_at, processed, processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ON CONFLICT (request_id) DO NOTHING
            "#,
        )
        .bind(row.request_id)
        .bind(&row.masked_pan)
        .bind(&row.pan_hash)
        .bind(&row.token)
        .bind(row.expiry_month)
        .bind(row.expiry_year)
        .bind(row.merchant_id)
        .bind(&row.merchant_name)
        .bind(&row.channel)
        .bind(&row.mcc)
        .bind(&row.country_code)
        .bind(&row.transaction_type)
        .bind(row.amount)
        .bind(&row.currency)
        .bind(&row.cryptogram)
        .bind(&row.pin_data)
        .bind(&row.three_ds)
        .bind(row.created_at)
        .bind(row.processed)
        .bind(row.processed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, request_id: RequestId) -> DbResult<Option<AuthorizationRequest>> {
        let row = sqlx::query_as::<_, DbRequest>("SELECT * FROM requests WHERE request_id = $1")
            .bind(request_id.value())
            .fetch_optional(&self.pool)
            .await?;
        row.map(AuthorizationRequest::try_from).transpose()
    }

    async fn mark_processed(&self, request_id: RequestId, now: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query("UPDATE requests SET processed = TRUE, processed_at = $2 WHERE request_id = $1")
            .bind(request_id.value())
            .bind(now)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("request {request_id}")));
        }
        Ok(())
    }
}

//! Decision repository (C6). `insert` is protected by the unique
//! constraint on `request_id` - at most one Decision per requestId;
//! `update` is used for the two allowed post-creation transitions -
//! challenge completion and reversal - and always targets the row by
//! `decision_id`.

use crate::error::{DbError, DbResult};
use crate::models::DbDecision;
use async_trait::async_trait;
use authz_types::{AuthorizationDecision, DecisionId, RequestId};
use sqlx::PgPool;

#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn insert(&self, decision: &AuthorizationDecision) -> DbResult<()>;
    async fn find_by_id(&self, decision_id: DecisionId) -> DbResult<Option<AuthorizationDecision>>;
    async fn find_by_request_id(&self, request_id: RequestId) -> DbResult<Option<AuthorizationDecision>>;
    async fn update(&self, decision: &AuthorizationDecision) -> DbResult<()>;
}

pub struct DecisionRepo {
    pool: PgPool,
}

impl DecisionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DecisionStore for DecisionRepo {
    async fn insert(&self, decision: &AuthorizationDecision) -> DbResult<()> {
        let row = DbDecision::try_from(decision)?;
        let result = sqlx::query(
            r#"
            INSERT INTO decisions (
                decision_id, request_id, decision, reason_code, reason_message, approved_amount,
                currency, authorization_code, risk_score, hold_id, limits_snapshot, balance_snapshot,
                decision_path, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (request_id) DO NOTHING
            "#,
        )
        .bind(row.decision_id)
        .bind(row.request_id)
        .bind(&row.decision)
        .bind(&row.reason_code)
        .bind(&row.reason_message)
        .bind(row.approved_amount)
        .bind(&row.currency)
        .bind(&row.authorization_code)
        .bind(row.risk_score)
        .bind(row.hold_id)
        .bind(&row.limits_snapshot)
        .bind(&row.balance_snapshot)
        .bind(&row.decision_path)
        .bind(row.created_at)
        .bind(row.expires_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("decision for request {} already exists", decision.request_id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, decision_id: DecisionId) -> DbResult<Option<AuthorizationDecision>> {
        let row = sqlx::query_as::<_, DbDecision>("SELECT * FROM decisions WHERE decision_id = $1")
            .bind(decision_id.value())
            .fetch_optional(&self.pool)
            .await?;
        row.map(AuthorizationDecision::try_from).transpose()
    }

    async fn find_by_request_id(&self, request_id: RequestId) -> DbResult<Option<AuthorizationDecision>> {
        let row = sqlx::query_as::<_, DbDecision>("SELECT * FROM decisions WHERE request_id = $1")
            .bind(request_id.value())
            .fetch_optional(&self.pool)
            .await?;
        row.map(AuthorizationDecision::try_from).transpose()
    }

    async fn update(&self, decision: &AuthorizationDecision) -> DbResult<()> {
        let row = DbDecision::try_from(decision)?;
        let result = sqlx::query(
            r#"
            UPDATE decisions SET
                decision = $2, reason_code = $3, reason_message = $4, approved_amount = $5,
                currency = $6, authorization_code = $7, risk_score = $8, hold_id = $9,
                limits_snapshot = $10, balance_snapshot = $11, decision_path = $12, expires_at = $13
            WHERE decision_id = $1
            "#,
        )
        .bind(row.decision_id)
        .bind(&row.decision)
        .bind(&row.reason_code)
        .bind(&row.reason_message)
        .bind(row.approved_amount)
        .bind(&row.currency)
        .bind(&row.authorization_code)
        .bind(row.risk_score)
        .bind(row.hold_id)
        .bind(&row.limits_snapshot)
        .bind(&row.balance_snapshot)
        .bind(&row.decision_path)
        .bind(row.expires_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("decision {}", decision.decision_id)));
        }
        Ok(())
    }
}

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CoursePurchase, PurchaseStatus},
    error::{AppError, Result},
    repository::PurchaseRepository,
};

#[derive(FromRow)]
struct PurchaseRow {
    id: String,
    course_id: String,
    user_id: String,
    amount: String,
    currency: String,
    status: String,
    payment_method: String,
    gateway_order_id: String,
    gateway_payment_id: Option<String>,
    refund_id: Option<String>,
    refund_amount: Option<String>,
    refund_reason: Option<String>,
    metadata: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const SELECT_PURCHASE: &str = r#"
    SELECT id, course_id, user_id, amount, currency, status,
           payment_method, gateway_order_id, gateway_payment_id,
           refund_id, refund_amount, refund_reason, metadata,
           created_at, updated_at
    FROM course_purchases
"#;

pub struct SqlitePurchaseRepository {
    pool: SqlitePool,
}

impl SqlitePurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_purchase(row: PurchaseRow) -> Result<CoursePurchase> {
        let metadata: HashMap<String, String> = serde_json::from_str(&row.metadata)
            .map_err(|e| AppError::Database(format!("Invalid purchase metadata: {}", e)))?;

        Ok(CoursePurchase {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            course_id: Uuid::parse_str(&row.course_id).map_err(|e| AppError::Database(e.to_string()))?,
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| AppError::Database(e.to_string()))?,
            amount: Self::parse_decimal(&row.amount)?,
            currency: row.currency,
            status: Self::parse_status(&row.status)?,
            payment_method: row.payment_method,
            gateway_order_id: row.gateway_order_id,
            gateway_payment_id: row.gateway_payment_id,
            refund_id: row.refund_id,
            refund_amount: row.refund_amount.as_deref().map(Self::parse_decimal).transpose()?,
            refund_reason: row.refund_reason,
            metadata,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_decimal(s: &str) -> Result<Decimal> {
        Decimal::from_str(s).map_err(|e| AppError::Database(format!("Invalid amount {}: {}", s, e)))
    }

    fn parse_status(s: &str) -> Result<PurchaseStatus> {
        match s {
            "Pending" => Ok(PurchaseStatus::Pending),
            "Completed" => Ok(PurchaseStatus::Completed),
            "Failed" => Ok(PurchaseStatus::Failed),
            "Refunded" => Ok(PurchaseStatus::Refunded),
            _ => Err(AppError::Database(format!("Invalid purchase status: {}", s))),
        }
    }

    fn status_to_str(status: PurchaseStatus) -> &'static str {
        match status {
            PurchaseStatus::Pending => "Pending",
            PurchaseStatus::Completed => "Completed",
            PurchaseStatus::Failed => "Failed",
            PurchaseStatus::Refunded => "Refunded",
        }
    }

    /// Conditional status change. The `WHERE status = ?` guard makes the
    /// transition a single atomic statement.
    async fn transition(
        &self,
        order_id: &str,
        from: PurchaseStatus,
        to: PurchaseStatus,
        payment_id: Option<&str>,
    ) -> Result<bool> {
        debug_assert!(from.can_transition_to(to));
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE course_purchases
            SET status = ?,
                gateway_payment_id = COALESCE(?, gateway_payment_id),
                updated_at = ?
            WHERE gateway_order_id = ? AND status = ?
            "#
        )
        .bind(Self::status_to_str(to))
        .bind(payment_id)
        .bind(now)
        .bind(order_id)
        .bind(Self::status_to_str(from))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl PurchaseRepository for SqlitePurchaseRepository {
    async fn create(&self, purchase: CoursePurchase) -> Result<CoursePurchase> {
        if purchase.gateway_order_id.is_empty() {
            return Err(AppError::Internal(
                "Purchase cannot be stored without a gateway order id".to_string(),
            ));
        }

        let metadata = serde_json::to_string(&purchase.metadata)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO course_purchases (
                id, course_id, user_id, amount, currency, status,
                payment_method, gateway_order_id, gateway_payment_id,
                refund_id, refund_amount, refund_reason, metadata,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(purchase.id.to_string())
        .bind(purchase.course_id.to_string())
        .bind(purchase.user_id.to_string())
        .bind(purchase.amount.to_string())
        .bind(&purchase.currency)
        .bind(Self::status_to_str(purchase.status))
        .bind(&purchase.payment_method)
        .bind(&purchase.gateway_order_id)
        .bind(&purchase.gateway_payment_id)
        .bind(&purchase.refund_id)
        .bind(purchase.refund_amount.map(|a| a.to_string()))
        .bind(&purchase.refund_reason)
        .bind(metadata)
        .bind(purchase.created_at.naive_utc())
        .bind(purchase.updated_at.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => AppError::Conflict(
                format!("A purchase already exists for order {}", purchase.gateway_order_id),
            ),
            other => AppError::Database(other.to_string()),
        })?;

        self.find_by_id(purchase.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created purchase".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CoursePurchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!("{} WHERE id = ?", SELECT_PURCHASE))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_purchase).transpose()
    }

    async fn find_by_gateway_order_id(&self, order_id: &str) -> Result<Option<CoursePurchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            "{} WHERE gateway_order_id = ?",
            SELECT_PURCHASE
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_purchase).transpose()
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<CoursePurchase>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            "{} WHERE user_id = ? ORDER BY created_at DESC",
            SELECT_PURCHASE
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_purchase)
            .collect()
    }

    async fn find_completed(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<CoursePurchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            "{} WHERE user_id = ? AND course_id = ? AND status = 'Completed' ORDER BY created_at DESC LIMIT 1",
            SELECT_PURCHASE
        ))
        .bind(user_id.to_string())
        .bind(course_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_purchase).transpose()
    }

    async fn mark_completed(&self, order_id: &str, payment_id: &str) -> Result<bool> {
        self.transition(order_id, PurchaseStatus::Pending, PurchaseStatus::Completed, Some(payment_id))
            .await
    }

    async fn mark_failed(&self, order_id: &str) -> Result<bool> {
        self.transition(order_id, PurchaseStatus::Pending, PurchaseStatus::Failed, None)
            .await
    }

    async fn record_refund(
        &self,
        id: Uuid,
        refund_id: &str,
        amount: Decimal,
        reason: &str,
    ) -> Result<bool> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE course_purchases
            SET status = 'Refunded',
                refund_id = ?,
                refund_amount = ?,
                refund_reason = ?,
                updated_at = ?
            WHERE id = ? AND status = 'Completed'
            "#
        )
        .bind(refund_id)
        .bind(amount.to_string())
        .bind(reason)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}

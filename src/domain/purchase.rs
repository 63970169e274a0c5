use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Window after purchase during which a refund may be requested.
pub const REFUND_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePurchase {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub status: PurchaseStatus,
    pub payment_method: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub refund_id: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub refund_amount: Option<Decimal>,
    pub refund_reason: Option<String>,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PurchaseStatus {
    pub fn can_transition_to(self, next: PurchaseStatus) -> bool {
        matches!(
            (self, next),
            (PurchaseStatus::Pending, PurchaseStatus::Completed)
                | (PurchaseStatus::Pending, PurchaseStatus::Failed)
                | (PurchaseStatus::Completed, PurchaseStatus::Refunded)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Failed => "failed",
            PurchaseStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CoursePurchase {
    /// A fresh checkout attempt. The gateway order id is filled in once the
    /// gateway has issued one; the record is never persisted before that.
    pub fn pending(
        course_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        currency: &str,
        payment_method: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            course_id,
            user_id,
            amount,
            currency: currency.to_string(),
            status: PurchaseStatus::Pending,
            payment_method: payment_method.to_string(),
            gateway_order_id: String::new(),
            gateway_payment_id: None,
            refund_id: None,
            refund_amount: None,
            refund_reason: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_refundable(&self, now: DateTime<Utc>) -> bool {
        self.status == PurchaseStatus::Completed
            && self.created_at > now - Duration::days(REFUND_WINDOW_DAYS)
    }

    /// Receipt reference handed to the gateway. Razorpay caps receipts at 40
    /// characters, so the simple (hyphenless) uuid form is used.
    pub fn receipt(&self) -> String {
        format!("rcpt_{}", self.id.simple())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub course_id: Uuid,
}

/// Fields relayed from the gateway's client-side checkout callback.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerification {
    #[serde(alias = "razorpay_order_id")]
    #[validate(length(min = 1, message = "orderId is required"))]
    pub order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    #[validate(length(min = 1, message = "paymentId is required"))]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    #[validate(length(min = 1, max = 500, message = "Refund reason must be 1-500 characters"))]
    pub reason: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use PurchaseStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Completed.can_transition_to(Refunded));

        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Refunded));
        for next in [Pending, Completed, Failed, Refunded] {
            assert!(!Failed.can_transition_to(next));
            assert!(!Refunded.can_transition_to(next));
        }
    }

    #[test]
    fn test_refund_window() {
        let mut purchase = CoursePurchase::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::new(500, 0),
            "INR",
            "razorpay",
        );
        let now = Utc::now();
        assert!(!purchase.is_refundable(now));

        purchase.status = PurchaseStatus::Completed;
        assert!(purchase.is_refundable(now));

        purchase.created_at = now - Duration::days(REFUND_WINDOW_DAYS + 1);
        assert!(!purchase.is_refundable(now));
    }

    #[test]
    fn test_receipt_fits_gateway_limit() {
        let purchase = CoursePurchase::pending(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::ONE,
            "INR",
            "razorpay",
        );
        assert!(purchase.receipt().len() <= 40);
    }

    #[test]
    fn test_verification_accepts_gateway_field_names() {
        let body = r#"{"razorpay_order_id":"order_1","razorpay_payment_id":"pay_1","razorpay_signature":"ab"}"#;
        let parsed: PaymentVerification = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.order_id, "order_1");
        assert!(parsed.validate().is_ok());

        let empty = PaymentVerification {
            order_id: String::new(),
            payment_id: "pay_1".to_string(),
            signature: "ab".to_string(),
        };
        assert!(empty.validate().is_err());
    }
}

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    payments::{GatewayOrder, GatewayRefund, OrderRequest, PaymentGateway},
};

/// In-process gateway that issues sequential order ids and records every
/// request. Used by the test suite and by local development without
/// Razorpay credentials.
pub struct FakePaymentGateway {
    key_id: String,
    key_secret: String,
    counter: AtomicU64,
    fail_next: AtomicBool,
    orders: Mutex<Vec<OrderRequest>>,
    refunds: Mutex<Vec<(String, Option<i64>)>>,
}

impl FakePaymentGateway {
    pub fn new(key_secret: impl Into<String>) -> Self {
        Self {
            key_id: "rzp_test_fake".to_string(),
            key_secret: key_secret.into(),
            counter: AtomicU64::new(0),
            fail_next: AtomicBool::new(false),
            orders: Mutex::new(Vec::new()),
            refunds: Mutex::new(Vec::new()),
        }
    }

    /// The next gateway call answers with an error.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn refunds(&self) -> Vec<(String, Option<i64>)> {
        self.refunds.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AppError::PaymentGateway("Simulated gateway failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    fn name(&self) -> &str {
        "fake"
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn key_secret(&self) -> &str {
        &self.key_secret
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder> {
        self.check_failure()?;

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut orders) = self.orders.lock() {
            orders.push(request.clone());
        }

        Ok(GatewayOrder {
            id: format!("order_fake{:06}", n),
            entity: Some("order".to_string()),
            amount: request.amount_minor,
            amount_paid: 0,
            amount_due: request.amount_minor,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: "created".to_string(),
            attempts: 0,
            notes: request.notes.clone(),
            created_at: chrono::Utc::now().timestamp(),
        })
    }

    async fn refund_payment(&self, payment_id: &str, amount_minor: Option<i64>) -> Result<GatewayRefund> {
        self.check_failure()?;

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut refunds) = self.refunds.lock() {
            refunds.push((payment_id.to_string(), amount_minor));
        }

        Ok(GatewayRefund {
            id: format!("rfnd_fake{:06}", n),
            payment_id: Some(payment_id.to_string()),
            amount: amount_minor.unwrap_or_default(),
            status: Some("processed".to_string()),
        })
    }
}

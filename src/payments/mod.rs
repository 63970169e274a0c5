use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod fake;
pub mod razorpay;
pub mod signature;

pub use fake::FakePaymentGateway;
pub use razorpay::RazorpayClient;

/// Order creation request in the gateway's terms. `amount_minor` is the
/// amount in the currency's smallest unit (paise for INR).
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    #[serde(rename = "amount")]
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: HashMap<String, String>,
}

/// Order as issued by the gateway. Passed through to the client unchanged so
/// the checkout widget can be opened against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayOrder {
    pub id: String,
    #[serde(default)]
    pub entity: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub notes: HashMap<String, String>,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayRefund {
    pub id: String,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub status: Option<String>,
}

/// Remote payment provider. Signature checks are local and live in
/// [`signature`]; this trait covers only the calls that leave the process.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &str;

    /// Public key the browser checkout is opened with.
    fn key_id(&self) -> &str;

    /// Shared secret used to verify checkout signatures.
    fn key_secret(&self) -> &str;

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder>;

    /// Refunds a captured payment. `None` refunds the full amount.
    async fn refund_payment(&self, payment_id: &str, amount_minor: Option<i64>) -> Result<GatewayRefund>;
}

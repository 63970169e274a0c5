use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::RazorpayConfig,
    error::{AppError, Result},
    payments::{GatewayOrder, GatewayRefund, OrderRequest, PaymentGateway},
};

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
struct RefundBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<i64>,
}

pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    max_retries: u32,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig, key_id: String, key_secret: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
            max_retries: config.max_retries,
        })
    }

    /// POSTs JSON with basic auth. Transport failures and 5xx answers are
    /// retried with exponential backoff; 4xx answers fail immediately.
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(self.max_retries as usize)
            .with_jitter()
            .build();

        let mut last_error = None;

        for (attempt, delay) in std::iter::once(Duration::ZERO).chain(backoff).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .http
                .post(&url)
                .basic_auth(&self.key_id, Some(&self.key_secret))
                .json(body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        path,
                        "Razorpay request failed, retrying"
                    );
                    last_error = Some(AppError::PaymentGateway(format!("Transport error: {}", e)));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<T>()
                    .await
                    .map_err(|e| AppError::PaymentGateway(format!("Malformed gateway response: {}", e)));
            }

            let text = response.text().await.unwrap_or_default();
            let error = AppError::PaymentGateway(describe_error(status, &text));

            if status.is_server_error() {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = self.max_retries,
                    status = status.as_u16(),
                    path,
                    "Razorpay returned a server error, retrying"
                );
                last_error = Some(error);
                continue;
            }

            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::PaymentGateway("Max retries exceeded".to_string())
        }))
    }
}

/// Turns a non-success answer into a message, preferring Razorpay's own
/// `error.description`.
fn describe_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => match (error.code, error.description) {
            (Some(code), Some(description)) => format!("{} ({}): {}", status.as_u16(), code, description),
            (None, Some(description)) => format!("{}: {}", status.as_u16(), description),
            (Some(code), None) => format!("{} ({})", status.as_u16(), code),
            (None, None) => format!("{}", status),
        },
        Err(_) => format!("{}", status),
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    fn name(&self) -> &str {
        "razorpay"
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn key_secret(&self) -> &str {
        &self.key_secret
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder> {
        let order: GatewayOrder = self.post("/orders", request).await?;
        tracing::debug!(order_id = %order.id, amount = order.amount, "Razorpay order created");
        Ok(order)
    }

    async fn refund_payment(&self, payment_id: &str, amount_minor: Option<i64>) -> Result<GatewayRefund> {
        let path = format!("/payments/{}/refund", payment_id);
        let refund: GatewayRefund = self.post(&path, &RefundBody { amount: amount_minor }).await?;
        tracing::debug!(refund_id = %refund.id, payment_id, "Razorpay refund issued");
        Ok(refund)
    }
}

use std::sync::Arc;
use crate::{
    config::Settings,
    error::{AppError, Result},
    service::{CheckoutService, ServiceContext},
};

#[derive(Clone)]
pub struct AppState {
    pub service_context: Arc<ServiceContext>,
    pub checkout_service: Option<Arc<CheckoutService>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        service_context: Arc<ServiceContext>,
        checkout_service: Option<Arc<CheckoutService>>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            service_context,
            checkout_service,
            settings,
        }
    }

    /// Payment routes answer 503 when no gateway is configured.
    pub fn checkout(&self) -> Result<&CheckoutService> {
        self.checkout_service
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("Payments are not configured".to_string()))
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{
        money, CoursePurchase, CourseSummary, PaymentVerification, PurchaseStatus, RefundRequest,
    },
    error::{AppError, Result},
    payments::{signature, GatewayOrder, OrderRequest, PaymentGateway},
    repository::{CourseRepository, PurchaseRepository, UserRepository},
};

/// What the browser needs to open the gateway's checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInitiation {
    pub order: GatewayOrder,
    pub course: CourseSummary,
    pub key_id: String,
}

/// Order initiation, payment verification and refunds against one payment
/// gateway.
pub struct CheckoutService {
    course_repo: Arc<dyn CourseRepository>,
    purchase_repo: Arc<dyn PurchaseRepository>,
    user_repo: Arc<dyn UserRepository>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        course_repo: Arc<dyn CourseRepository>,
        purchase_repo: Arc<dyn PurchaseRepository>,
        user_repo: Arc<dyn UserRepository>,
        gateway: Arc<dyn PaymentGateway>,
        currency: &str,
    ) -> Result<Self> {
        Ok(Self {
            course_repo,
            purchase_repo,
            user_repo,
            gateway,
            currency: money::normalize_currency(currency)?,
        })
    }

    /// Creates a gateway order for a published course and records the pending
    /// purchase. Nothing is stored unless the gateway accepted the order.
    pub async fn initiate_order(&self, user_id: Uuid, course_id: Uuid) -> Result<OrderInitiation> {
        let course = self.course_repo
            .find_by_id(course_id)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        if self.purchase_repo.find_completed(user_id, course_id).await?.is_some() {
            return Err(AppError::Conflict("You have already purchased this course".to_string()));
        }

        if course.price.is_zero() {
            return Err(AppError::BadRequest("Free courses do not go through checkout".to_string()));
        }

        let mut purchase = CoursePurchase::pending(
            course.id,
            user_id,
            course.price,
            &self.currency,
            self.gateway.name(),
        );
        let amount_minor = money::to_minor_units(course.price, &self.currency)?;

        let notes: HashMap<String, String> = [
            ("courseId".to_string(), course.id.to_string()),
            ("userId".to_string(), user_id.to_string()),
            ("purchaseId".to_string(), purchase.id.to_string()),
        ]
        .into_iter()
        .collect();

        let request = OrderRequest {
            amount_minor,
            currency: self.currency.clone(),
            receipt: purchase.receipt(),
            notes: notes.clone(),
        };

        let order = self.gateway
            .create_order(&request)
            .await
            .map_err(|e| match e {
                AppError::PaymentGateway(_) => e,
                other => AppError::PaymentGateway(other.to_string()),
            })?;

        purchase.gateway_order_id = order.id.clone();
        purchase.metadata = notes;

        if let Err(e) = self.purchase_repo.create(purchase).await {
            tracing::error!(
                target: "reconciliation",
                order_id = %order.id,
                user_id = %user_id,
                course_id = %course.id,
                error = %e,
                "Gateway order created but purchase record was not stored"
            );
            return Err(e);
        }

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            course_id = %course.id,
            amount_minor,
            currency = %self.currency,
            "Checkout order created"
        );

        Ok(OrderInitiation {
            course: CourseSummary::from(&course),
            key_id: self.gateway.key_id().to_string(),
            order,
        })
    }

    /// Checks the checkout signature and completes the matching purchase.
    ///
    /// A mismatch fails a pending purchase and leaves any other state alone.
    /// Re-verifying a completed purchase with a valid signature succeeds
    /// without changing it.
    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        verification: &PaymentVerification,
    ) -> Result<CoursePurchase> {
        verification.validate()?;
        let order_id = verification.order_id.as_str();
        let payment_id = verification.payment_id.as_str();

        let purchase = self.purchase_repo
            .find_by_gateway_order_id(order_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Purchase record not found".to_string()))?;

        let authentic = signature::verify_signature(
            self.gateway.key_secret(),
            order_id,
            payment_id,
            &verification.signature,
        );

        if !authentic {
            if purchase.status == PurchaseStatus::Pending
                && self.purchase_repo.mark_failed(order_id).await?
            {
                tracing::info!(order_id, purchase_id = %purchase.id, "Purchase marked failed");
            }
            tracing::warn!(
                order_id,
                payment_id,
                user_id = %user_id,
                status = %purchase.status,
                "Payment signature mismatch"
            );
            return Err(AppError::SignatureMismatch);
        }

        match purchase.status {
            PurchaseStatus::Completed => {
                tracing::debug!(order_id, "Purchase already completed");
                self.user_repo.enroll(user_id, purchase.course_id).await?;
                Ok(purchase)
            }
            PurchaseStatus::Failed | PurchaseStatus::Refunded => Err(AppError::Conflict(format!(
                "Purchase is already {}",
                purchase.status
            ))),
            PurchaseStatus::Pending => {
                let moved = self.purchase_repo.mark_completed(order_id, payment_id).await?;

                let current = self.purchase_repo
                    .find_by_gateway_order_id(order_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Purchase record not found".to_string()))?;

                // A concurrent verification may have won the update.
                if current.status != PurchaseStatus::Completed {
                    return Err(AppError::Conflict(format!(
                        "Purchase is already {}",
                        current.status
                    )));
                }

                self.user_repo.enroll(user_id, current.course_id).await?;

                if moved {
                    tracing::info!(
                        order_id,
                        payment_id,
                        purchase_id = %current.id,
                        user_id = %user_id,
                        course_id = %current.course_id,
                        "Payment verified, purchase completed"
                    );
                }

                Ok(current)
            }
        }
    }

    /// Refunds a completed purchase within the refund window and removes the
    /// enrollment it granted.
    pub async fn refund(
        &self,
        user_id: Uuid,
        purchase_id: Uuid,
        request: &RefundRequest,
    ) -> Result<CoursePurchase> {
        request.validate()?;

        let purchase = self.purchase_repo
            .find_by_id(purchase_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Purchase not found".to_string()))?;

        if purchase.status != PurchaseStatus::Completed {
            return Err(AppError::Conflict(format!(
                "Only completed purchases can be refunded; this one is {}",
                purchase.status
            )));
        }
        if !purchase.is_refundable(Utc::now()) {
            return Err(AppError::BadRequest("The refund window for this purchase has closed".to_string()));
        }

        let amount = request.amount.unwrap_or(purchase.amount);
        if amount <= Decimal::ZERO || amount > purchase.amount {
            return Err(AppError::Validation(format!(
                "Refund amount must be greater than 0 and at most {}",
                purchase.amount
            )));
        }

        let payment_id = purchase.gateway_payment_id.as_deref().ok_or_else(|| {
            AppError::Internal(format!("Completed purchase {} has no payment id", purchase.id))
        })?;
        let amount_minor = money::to_minor_units(amount, &purchase.currency)?;

        let refund = self.gateway
            .refund_payment(payment_id, Some(amount_minor))
            .await?;

        let recorded = self.purchase_repo
            .record_refund(purchase.id, &refund.id, amount, request.reason.trim())
            .await?;

        if !recorded {
            tracing::error!(
                target: "reconciliation",
                refund_id = %refund.id,
                purchase_id = %purchase.id,
                "Gateway refund issued but purchase was no longer completed"
            );
            return Err(AppError::Conflict("Purchase changed while the refund was processed".to_string()));
        }

        self.user_repo.unenroll(user_id, purchase.course_id).await?;

        tracing::info!(
            purchase_id = %purchase.id,
            refund_id = %refund.id,
            amount = %amount,
            "Purchase refunded"
        );

        self.purchase_repo
            .find_by_id(purchase.id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve refunded purchase".to_string()))
    }
}

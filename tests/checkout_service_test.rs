mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use lectern::{
    database::DatabaseManager,
    domain::{Course, CoursePurchase, PaymentVerification, PurchaseStatus, RefundRequest, User, UserRole},
    error::AppError,
    payments::{signature::expected_signature, FakePaymentGateway},
    repository::{
        PurchaseRepository, SqliteCourseRepository, SqlitePurchaseRepository,
        SqliteUserRepository, UserRepository,
    },
    service::CheckoutService,
};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;

const SECRET: &str = "test_key_secret";

struct Fixture {
    database: DatabaseManager,
    gateway: Arc<FakePaymentGateway>,
    service: CheckoutService,
    purchases: Arc<SqlitePurchaseRepository>,
    users: Arc<SqliteUserRepository>,
    student: User,
    course: Course,
}

async fn fixture(price: Decimal) -> anyhow::Result<Fixture> {
    fixture_with_secret(price, SECRET).await
}

async fn fixture_with_secret(price: Decimal, secret: &str) -> anyhow::Result<Fixture> {
    let database = common::memory_database().await?;
    let pool = database.pool().clone();

    let instructor = common::create_user(&database, "ira@example.com", UserRole::Instructor).await?;
    let student = common::create_user(&database, "sam@example.com", UserRole::Student).await?;
    let course = common::create_course(&database, &instructor, price, true).await?;

    let gateway = Arc::new(FakePaymentGateway::new(secret));
    let purchases = Arc::new(SqlitePurchaseRepository::new(pool.clone()));
    let users = Arc::new(SqliteUserRepository::new(pool.clone()));

    let service = CheckoutService::new(
        Arc::new(SqliteCourseRepository::new(pool)),
        purchases.clone(),
        users.clone(),
        gateway.clone(),
        "inr",
    )?;

    Ok(Fixture { database, gateway, service, purchases, users, student, course })
}

fn verification(order_id: &str, payment_id: &str, signature: String) -> PaymentVerification {
    PaymentVerification {
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
        signature,
    }
}

fn signed(order_id: &str, payment_id: &str) -> PaymentVerification {
    verification(order_id, payment_id, expected_signature(SECRET, order_id, payment_id))
}

#[tokio::test]
async fn test_initiate_order_records_pending_purchase() -> anyhow::Result<()> {
    let f = fixture(Decimal::new(49999, 2)).await?;

    let initiation = f.service.initiate_order(f.student.id, f.course.id).await?;
    assert_eq!(initiation.key_id, "rzp_test_fake");
    assert_eq!(initiation.course.name, f.course.title);
    assert_eq!(initiation.order.amount, 49999);
    assert_eq!(initiation.order.currency, "INR");

    let sent = f.gateway.orders();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].amount_minor, 49999);
    assert!(sent[0].receipt.starts_with("rcpt_"));
    assert_eq!(sent[0].notes.get("courseId"), Some(&f.course.id.to_string()));
    assert_eq!(sent[0].notes.get("userId"), Some(&f.student.id.to_string()));

    let purchase = f.purchases.find_by_gateway_order_id(&initiation.order.id).await?
        .ok_or_else(|| anyhow::anyhow!("purchase not stored"))?;
    assert_eq!(purchase.status, PurchaseStatus::Pending);
    assert_eq!(purchase.amount, Decimal::new(49999, 2));
    assert_eq!(purchase.user_id, f.student.id);

    Ok(())
}

#[tokio::test]
async fn test_known_secret_completes_five_hundred_rupee_purchase() -> anyhow::Result<()> {
    let f = fixture_with_secret(Decimal::new(500, 0), "abc").await?;

    let order = f.service.initiate_order(f.student.id, f.course.id).await?.order;
    assert_eq!(order.amount, 50000);
    assert_eq!(f.gateway.orders()[0].amount_minor, 50000);

    let pending = f.purchases.find_by_gateway_order_id(&order.id).await?
        .ok_or_else(|| anyhow::anyhow!("purchase not stored"))?;
    assert_eq!(pending.amount, Decimal::new(500, 0));

    let mut mac = Hmac::<Sha256>::new_from_slice(b"abc").expect("HMAC can take key of any size");
    mac.update(format!("{}|pay_1", order.id).as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    // Any other hex string is refused
    let mut other = signature.into_bytes();
    other[0] = if other[0] == b'0' { b'1' } else { b'0' };
    let other = String::from_utf8(other)?;
    let result = f.service
        .verify_payment(f.student.id, &verification(&order.id, "pay_1", other))
        .await;
    assert!(matches!(result, Err(AppError::SignatureMismatch)));

    // A fresh order; the rejected one is now failed
    let order = f.service.initiate_order(f.student.id, f.course.id).await?.order;
    let mut mac = Hmac::<Sha256>::new_from_slice(b"abc").expect("HMAC can take key of any size");
    mac.update(format!("{}|pay_1", order.id).as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let completed = f.service
        .verify_payment(f.student.id, &verification(&order.id, "pay_1", signature))
        .await?;
    assert_eq!(completed.status, PurchaseStatus::Completed);
    assert_eq!(completed.amount, Decimal::new(500, 0));
    assert!(f.users.is_enrolled(f.student.id, f.course.id).await?);

    Ok(())
}

#[tokio::test]
async fn test_initiate_order_rejections() -> anyhow::Result<()> {
    let f = fixture(Decimal::new(500, 0)).await?;

    let missing = f.service.initiate_order(f.student.id, uuid::Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    // Gateway failure leaves nothing behind
    f.gateway.fail_next_call();
    let failed = f.service.initiate_order(f.student.id, f.course.id).await;
    assert!(matches!(failed, Err(AppError::PaymentGateway(_))));
    assert!(f.purchases.find_by_user(f.student.id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_free_course_skips_checkout() -> anyhow::Result<()> {
    let f = fixture(Decimal::ZERO).await?;

    let result = f.service.initiate_order(f.student.id, f.course.id).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(f.gateway.orders().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_verify_payment_completes_and_enrolls() -> anyhow::Result<()> {
    let f = fixture(Decimal::new(500, 0)).await?;
    let order = f.service.initiate_order(f.student.id, f.course.id).await?.order;

    let purchase = f.service
        .verify_payment(f.student.id, &signed(&order.id, "pay_123"))
        .await?;
    assert_eq!(purchase.status, PurchaseStatus::Completed);
    assert_eq!(purchase.gateway_payment_id.as_deref(), Some("pay_123"));
    assert!(f.users.is_enrolled(f.student.id, f.course.id).await?);

    // Replaying the same callback succeeds without a second enrollment
    let replay = f.service
        .verify_payment(f.student.id, &signed(&order.id, "pay_123"))
        .await?;
    assert_eq!(replay.id, purchase.id);
    assert_eq!(f.users.list_enrollments(f.student.id).await?.len(), 1);

    // Bought courses cannot be ordered again
    let again = f.service.initiate_order(f.student.id, f.course.id).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    Ok(())
}

#[tokio::test]
async fn test_signature_mismatch_fails_pending_purchase() -> anyhow::Result<()> {
    let f = fixture(Decimal::new(500, 0)).await?;
    let order = f.service.initiate_order(f.student.id, f.course.id).await?.order;

    let forged = verification(&order.id, "pay_123", expected_signature("wrong", &order.id, "pay_123"));
    let result = f.service.verify_payment(f.student.id, &forged).await;
    assert!(matches!(result, Err(AppError::SignatureMismatch)));

    let purchase = f.purchases.find_by_gateway_order_id(&order.id).await?
        .ok_or_else(|| anyhow::anyhow!("purchase missing"))?;
    assert_eq!(purchase.status, PurchaseStatus::Failed);
    assert!(!f.users.is_enrolled(f.student.id, f.course.id).await?);

    // A correct signature cannot revive a failed purchase
    let late = f.service.verify_payment(f.student.id, &signed(&order.id, "pay_123")).await;
    assert!(matches!(late, Err(AppError::Conflict(_))));

    Ok(())
}

#[tokio::test]
async fn test_mismatch_leaves_completed_purchase_alone() -> anyhow::Result<()> {
    let f = fixture(Decimal::new(500, 0)).await?;
    let order = f.service.initiate_order(f.student.id, f.course.id).await?.order;
    f.service.verify_payment(f.student.id, &signed(&order.id, "pay_123")).await?;

    let result = f.service
        .verify_payment(f.student.id, &verification(&order.id, "pay_123", "00".repeat(32)))
        .await;
    assert!(matches!(result, Err(AppError::SignatureMismatch)));

    let purchase = f.purchases.find_by_gateway_order_id(&order.id).await?
        .ok_or_else(|| anyhow::anyhow!("purchase missing"))?;
    assert_eq!(purchase.status, PurchaseStatus::Completed);

    Ok(())
}

#[tokio::test]
async fn test_verify_requires_owned_record() -> anyhow::Result<()> {
    let f = fixture(Decimal::new(500, 0)).await?;
    let order = f.service.initiate_order(f.student.id, f.course.id).await?.order;
    let other = common::create_user(&f.database, "eve@example.com", UserRole::Student).await?;

    let unknown = f.service.verify_payment(f.student.id, &signed("order_unknown", "pay_1")).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    let foreign = f.service.verify_payment(other.id, &signed(&order.id, "pay_1")).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    // The owner's record was not touched by the foreign attempt
    let purchase = f.purchases.find_by_gateway_order_id(&order.id).await?
        .ok_or_else(|| anyhow::anyhow!("purchase missing"))?;
    assert_eq!(purchase.status, PurchaseStatus::Pending);

    let empty = f.service.verify_payment(f.student.id, &verification(&order.id, "", String::new())).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn test_refund_flow() -> anyhow::Result<()> {
    let f = fixture(Decimal::new(500, 0)).await?;
    let order = f.service.initiate_order(f.student.id, f.course.id).await?.order;
    let purchase = f.service.verify_payment(f.student.id, &signed(&order.id, "pay_123")).await?;

    let too_much = RefundRequest { reason: "Not for me".to_string(), amount: Some(Decimal::new(501, 0)) };
    let result = f.service.refund(f.student.id, purchase.id, &too_much).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let partial = RefundRequest { reason: "Not for me".to_string(), amount: Some(Decimal::new(250, 0)) };
    let refunded = f.service.refund(f.student.id, purchase.id, &partial).await?;
    assert_eq!(refunded.status, PurchaseStatus::Refunded);
    assert_eq!(refunded.refund_amount, Some(Decimal::new(250, 0)));
    assert!(refunded.refund_id.is_some());
    assert_eq!(f.gateway.refunds(), vec![("pay_123".to_string(), Some(25000))]);
    assert!(!f.users.is_enrolled(f.student.id, f.course.id).await?);

    let twice = f.service.refund(f.student.id, purchase.id, &partial).await;
    assert!(matches!(twice, Err(AppError::Conflict(_))));

    Ok(())
}

#[tokio::test]
async fn test_refund_window_closes() -> anyhow::Result<()> {
    let f = fixture(Decimal::new(500, 0)).await?;

    let mut old = CoursePurchase::pending(f.course.id, f.student.id, f.course.price, "INR", "fake");
    old.gateway_order_id = "order_old".to_string();
    old.gateway_payment_id = Some("pay_old".to_string());
    old.status = PurchaseStatus::Completed;
    old.created_at = Utc::now() - Duration::days(31);
    let old = f.purchases.create(old).await?;

    let request = RefundRequest { reason: "Too late".to_string(), amount: None };
    let result = f.service.refund(f.student.id, old.id, &request).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(f.gateway.refunds().is_empty());

    let stranger = common::create_user(&f.database, "eve@example.com", UserRole::Student).await?;
    let foreign = f.service.refund(stranger.id, old.id, &request).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));

    Ok(())
}

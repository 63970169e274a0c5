mod common;

use lectern::{
    domain::{CoursePurchase, ProfileUpdate, PurchaseStatus, UserRole},
    error::AppError,
    repository::{
        CourseRepository, PurchaseRepository, SqliteCourseRepository, SqlitePurchaseRepository,
        SqliteUserRepository, UserRepository,
    },
};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_user_crud() -> anyhow::Result<()> {
    let database = common::memory_database().await?;
    let repo = SqliteUserRepository::new(database.pool().clone());

    let user = common::create_user(&database, "Asha@Example.com", UserRole::Student).await?;
    assert_eq!(user.email, "asha@example.com");
    assert_eq!(user.role, UserRole::Student);

    // Lookup by email ignores case
    let found = repo.find_by_email("ASHA@example.com").await?;
    assert_eq!(found.map(|u| u.id), Some(user.id));

    // Duplicate email
    let duplicate = common::create_user(&database, "asha@example.com", UserRole::Student).await;
    assert!(duplicate.is_err());

    // Partial profile update keeps untouched fields
    let updated = repo.update_profile(user.id, ProfileUpdate {
        bio: Some("Learning Rust".to_string()),
        ..Default::default()
    }).await?;
    assert_eq!(updated.bio.as_deref(), Some("Learning Rust"));
    assert_eq!(updated.name, user.name);

    let updated = repo.set_avatar(user.id, "https://cdn.example.com/a.png", "a").await?;
    assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn.example.com/a.png"));
    assert_eq!(updated.avatar_public_id.as_deref(), Some("a"));

    Ok(())
}

#[tokio::test]
async fn test_enrollment_is_idempotent() -> anyhow::Result<()> {
    let database = common::memory_database().await?;
    let users = SqliteUserRepository::new(database.pool().clone());
    let courses = SqliteCourseRepository::new(database.pool().clone());

    let instructor = common::create_user(&database, "ira@example.com", UserRole::Instructor).await?;
    let student = common::create_user(&database, "sam@example.com", UserRole::Student).await?;
    let course = common::create_course(&database, &instructor, Decimal::new(499, 0), true).await?;

    users.enroll(student.id, course.id).await?;
    users.enroll(student.id, course.id).await?;

    assert!(users.is_enrolled(student.id, course.id).await?);
    let enrollments = users.list_enrollments(student.id).await?;
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0].course_id, course.id);
    assert_eq!(courses.count_enrolled(course.id).await?, 1);

    users.unenroll(student.id, course.id).await?;
    assert!(!users.is_enrolled(student.id, course.id).await?);

    Ok(())
}

#[tokio::test]
async fn test_course_publishing() -> anyhow::Result<()> {
    let database = common::memory_database().await?;
    let repo = SqliteCourseRepository::new(database.pool().clone());

    let instructor = common::create_user(&database, "ira@example.com", UserRole::Instructor).await?;
    let draft = common::create_course(&database, &instructor, Decimal::new(49999, 2), false).await?;
    assert_eq!(draft.price, Decimal::new(49999, 2));

    assert!(repo.list_published(10, 0).await?.is_empty());

    let published = repo.set_published(draft.id, true).await?;
    assert!(published.is_published);
    assert_eq!(repo.list_published(10, 0).await?.len(), 1);

    let missing = repo.set_published(uuid::Uuid::new_v4(), true).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_purchase_transitions_are_guarded() -> anyhow::Result<()> {
    let database = common::memory_database().await?;
    let repo = SqlitePurchaseRepository::new(database.pool().clone());

    let instructor = common::create_user(&database, "ira@example.com", UserRole::Instructor).await?;
    let student = common::create_user(&database, "sam@example.com", UserRole::Student).await?;
    let course = common::create_course(&database, &instructor, Decimal::new(500, 0), true).await?;

    let mut purchase = CoursePurchase::pending(course.id, student.id, course.price, "INR", "razorpay");

    // Never stored without a gateway order id
    assert!(repo.create(purchase.clone()).await.is_err());

    purchase.gateway_order_id = "order_repo1".to_string();
    let stored = repo.create(purchase).await?;
    assert_eq!(stored.status, PurchaseStatus::Pending);
    assert_eq!(stored.amount, Decimal::new(500, 0));

    assert!(repo.mark_completed("order_repo1", "pay_repo1").await?);
    // Second transition out of pending finds nothing to update
    assert!(!repo.mark_completed("order_repo1", "pay_other").await?);
    assert!(!repo.mark_failed("order_repo1").await?);

    let completed = repo.find_by_gateway_order_id("order_repo1").await?
        .ok_or_else(|| anyhow::anyhow!("purchase missing"))?;
    assert_eq!(completed.status, PurchaseStatus::Completed);
    assert_eq!(completed.gateway_payment_id.as_deref(), Some("pay_repo1"));
    assert!(repo.find_completed(student.id, course.id).await?.is_some());

    assert!(repo.record_refund(completed.id, "rfnd_1", Decimal::new(250, 0), "Changed my mind").await?);
    assert!(!repo.record_refund(completed.id, "rfnd_2", Decimal::new(250, 0), "Again").await?);

    let refunded = repo.find_by_id(completed.id).await?
        .ok_or_else(|| anyhow::anyhow!("purchase missing"))?;
    assert_eq!(refunded.status, PurchaseStatus::Refunded);
    assert_eq!(refunded.refund_id.as_deref(), Some("rfnd_1"));
    assert_eq!(refunded.refund_amount, Some(Decimal::new(250, 0)));

    Ok(())
}

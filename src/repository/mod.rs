use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod user_repository;
pub mod course_repository;
pub mod purchase_repository;
pub mod progress_repository;
pub mod review_repository;

pub use user_repository::SqliteUserRepository;
pub use course_repository::SqliteCourseRepository;
pub use purchase_repository::SqlitePurchaseRepository;
pub use progress_repository::SqliteProgressRepository;
pub use review_repository::SqliteReviewRepository;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn get_password_hash(&self, email: &str) -> Result<Option<String>>;
    async fn get_password_hash_by_id(&self, id: Uuid) -> Result<Option<String>>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User>;
    async fn set_avatar(&self, id: Uuid, url: &str, public_id: &str) -> Result<User>;
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<()>;
    async fn touch_last_active(&self, id: Uuid) -> Result<()>;
    /// Idempotent: enrolling twice leaves one enrollment.
    async fn enroll(&self, user_id: Uuid, course_id: Uuid) -> Result<()>;
    async fn unenroll(&self, user_id: Uuid, course_id: Uuid) -> Result<()>;
    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> Result<bool>;
    async fn list_enrollments(&self, user_id: Uuid) -> Result<Vec<Enrollment>>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, course: Course) -> Result<Course>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>>;
    async fn list_published(&self, limit: i64, offset: i64) -> Result<Vec<Course>>;
    async fn set_published(&self, id: Uuid, published: bool) -> Result<Course>;
    async fn count_enrolled(&self, id: Uuid) -> Result<i64>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn create(&self, purchase: CoursePurchase) -> Result<CoursePurchase>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CoursePurchase>>;
    async fn find_by_gateway_order_id(&self, order_id: &str) -> Result<Option<CoursePurchase>>;
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<CoursePurchase>>;
    async fn find_completed(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<CoursePurchase>>;
    /// Atomically moves a pending purchase to completed. Returns false when
    /// no pending record matched.
    async fn mark_completed(&self, order_id: &str, payment_id: &str) -> Result<bool>;
    /// Atomically moves a pending purchase to failed.
    async fn mark_failed(&self, order_id: &str) -> Result<bool>;
    /// Atomically moves a completed purchase to refunded.
    async fn record_refund(
        &self,
        id: Uuid,
        refund_id: &str,
        amount: Decimal,
        reason: &str,
    ) -> Result<bool>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn find(&self, user_id: Uuid, course_id: Uuid) -> Result<Option<CourseProgress>>;
    async fn save(&self, progress: &CourseProgress) -> Result<CourseProgress>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, review: Review) -> Result<Review>;
    async fn list_for_course(&self, course_id: Uuid) -> Result<Vec<Review>>;
    async fn ratings_for_course(&self, course_id: Uuid) -> Result<Vec<u8>>;
}

pub mod checkout_service;
pub mod course_service;
pub mod progress_service;
pub mod review_service;
pub mod user_service;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Settings;
use crate::database::DatabaseManager;
use crate::media::MediaStore;
use crate::repository::*;
use course_service::CourseService;
use progress_service::ProgressService;
use review_service::ReviewService;
use user_service::UserService;

pub use checkout_service::{CheckoutService, OrderInitiation};
pub use user_service::UploadedFile;

pub struct ServiceContext {
    pub user_repo: Arc<dyn UserRepository>,
    pub course_repo: Arc<dyn CourseRepository>,
    pub purchase_repo: Arc<dyn PurchaseRepository>,
    pub progress_repo: Arc<dyn ProgressRepository>,
    pub review_repo: Arc<dyn ReviewRepository>,
    pub auth_service: Arc<AuthService>,
    pub media_store: Arc<dyn MediaStore>,
    pub user_service: Arc<UserService>,
    pub course_service: Arc<CourseService>,
    pub progress_service: Arc<ProgressService>,
    pub review_service: Arc<ReviewService>,
    pub database: DatabaseManager,
}

impl ServiceContext {
    pub fn new(
        database: DatabaseManager,
        settings: &Settings,
        media_store: Arc<dyn MediaStore>,
    ) -> Self {
        let pool = database.pool().clone();

        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
        let course_repo: Arc<dyn CourseRepository> = Arc::new(SqliteCourseRepository::new(pool.clone()));
        let purchase_repo: Arc<dyn PurchaseRepository> = Arc::new(SqlitePurchaseRepository::new(pool.clone()));
        let progress_repo: Arc<dyn ProgressRepository> = Arc::new(SqliteProgressRepository::new(pool.clone()));
        let review_repo: Arc<dyn ReviewRepository> = Arc::new(SqliteReviewRepository::new(pool.clone()));

        let auth_service = Arc::new(AuthService::new(
            pool,
            settings.auth.session_duration_hours,
            settings.auth.secure_cookies,
        ));

        let user_service = Arc::new(UserService::new(
            user_repo.clone(),
            auth_service.clone(),
            media_store.clone(),
        ));
        let course_service = Arc::new(CourseService::new(course_repo.clone(), review_repo.clone()));
        let progress_service = Arc::new(ProgressService::new(progress_repo.clone(), user_repo.clone()));
        let review_service = Arc::new(ReviewService::new(
            review_repo.clone(),
            course_repo.clone(),
            user_repo.clone(),
        ));

        Self {
            user_repo,
            course_repo,
            purchase_repo,
            progress_repo,
            review_repo,
            auth_service,
            media_store,
            user_service,
            course_service,
            progress_service,
            review_service,
            database,
        }
    }
}

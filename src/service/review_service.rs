use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{CourseRepository, ReviewRepository, UserRepository},
};

pub struct ReviewService {
    repo: Arc<dyn ReviewRepository>,
    course_repo: Arc<dyn CourseRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ReviewService {
    pub fn new(
        repo: Arc<dyn ReviewRepository>,
        course_repo: Arc<dyn CourseRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self { repo, course_repo, user_repo }
    }

    pub async fn add(&self, user_id: Uuid, course_id: Uuid, request: CreateReviewRequest) -> Result<Review> {
        request.validate()?;

        if self.course_repo.find_by_id(course_id).await?.is_none() {
            return Err(AppError::NotFound("Course not found".to_string()));
        }
        if !self.user_repo.is_enrolled(user_id, course_id).await? {
            return Err(AppError::Forbidden);
        }

        let now = Utc::now();
        self.repo
            .create(Review {
                id: Uuid::new_v4(),
                course_id,
                user_id,
                rating: request.rating,
                comment: request.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn list(&self, course_id: Uuid) -> Result<Vec<Review>> {
        if self.course_repo.find_by_id(course_id).await?.is_none() {
            return Err(AppError::NotFound("Course not found".to_string()));
        }
        self.repo.list_for_course(course_id).await
    }
}

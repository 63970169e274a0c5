use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{ProgressRepository, UserRepository},
};

pub struct ProgressService {
    repo: Arc<dyn ProgressRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ProgressService {
    pub fn new(repo: Arc<dyn ProgressRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { repo, user_repo }
    }

    async fn require_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<()> {
        if !self.user_repo.is_enrolled(user_id, course_id).await? {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    /// Progress is created on first access; every read bumps last-accessed.
    pub async fn get(&self, user_id: Uuid, course_id: Uuid) -> Result<CourseProgress> {
        self.require_enrollment(user_id, course_id).await?;

        let mut progress = self.repo
            .find(user_id, course_id)
            .await?
            .unwrap_or_else(|| CourseProgress::new(user_id, course_id));
        progress.last_accessed = Utc::now();

        self.repo.save(&progress).await
    }

    pub async fn update_lecture(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        lecture_id: Uuid,
        update: LectureUpdate,
    ) -> Result<CourseProgress> {
        update.validate()?;
        self.require_enrollment(user_id, course_id).await?;

        let mut progress = self.repo
            .find(user_id, course_id)
            .await?
            .unwrap_or_else(|| CourseProgress::new(user_id, course_id));
        progress.apply(lecture_id, &update);

        let saved = self.repo.save(&progress).await?;
        if saved.is_completed {
            tracing::info!(user_id = %user_id, course_id = %course_id, "Course completed");
        }
        Ok(saved)
    }
}

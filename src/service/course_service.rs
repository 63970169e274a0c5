use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{CourseRepository, ReviewRepository},
};

const MAX_PAGE_SIZE: i64 = 100;

pub struct CourseService {
    repo: Arc<dyn CourseRepository>,
    review_repo: Arc<dyn ReviewRepository>,
}

impl CourseService {
    pub fn new(repo: Arc<dyn CourseRepository>, review_repo: Arc<dyn ReviewRepository>) -> Self {
        Self { repo, review_repo }
    }

    /// New courses start unpublished.
    pub async fn create(&self, instructor: &User, request: CreateCourseRequest) -> Result<Course> {
        if !instructor.can_teach() {
            return Err(AppError::Forbidden);
        }
        request.validate()?;

        let course = self.repo.create(request.into_course(instructor.id)).await?;
        tracing::info!(course_id = %course.id, instructor_id = %instructor.id, "Course created");
        Ok(course)
    }

    pub async fn list_published(&self, limit: i64, offset: i64) -> Result<Vec<Course>> {
        self.repo
            .list_published(limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
            .await
    }

    pub async fn detail(&self, id: Uuid) -> Result<CourseDetail> {
        let course = self.repo
            .find_by_id(id)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let ratings = self.review_repo.ratings_for_course(id).await?;
        let enrolled_students = self.repo.count_enrolled(id).await?;

        Ok(CourseDetail {
            average_rating: average_rating(&ratings),
            review_count: ratings.len() as i64,
            enrolled_students,
            course,
        })
    }

    /// Only the owning instructor or an admin may publish.
    pub async fn publish(&self, user: &User, id: Uuid) -> Result<Course> {
        let course = self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        if course.instructor_id != user.id && user.role != UserRole::Admin {
            return Err(AppError::Forbidden);
        }
        if course.is_published {
            return Ok(course);
        }

        let course = self.repo.set_published(id, true).await?;
        tracing::info!(course_id = %course.id, "Course published");
        Ok(course)
    }
}

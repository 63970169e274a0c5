use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub level: CourseLevel,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub thumbnail: String,
    pub instructor_id: Uuid,
    pub is_published: bool,
    pub total_duration: i64,
    pub total_lectures: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// What checkout shows the buyer about the course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseSummary {
    pub name: String,
    pub description: Option<String>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            name: course.title.clone(),
            description: course.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub average_rating: f64,
    pub review_count: i64,
    pub enrolled_students: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 100, message = "Course title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(max = 200, message = "Course subtitle cannot exceed 200 characters"))]
    pub subtitle: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Course category is required"))]
    pub category: String,
    #[serde(default)]
    pub level: CourseLevel,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    #[validate(length(min = 1, message = "Course thumbnail is required"))]
    pub thumbnail: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Total duration must be non-negative"))]
    pub total_duration: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Total lectures must be non-negative"))]
    pub total_lectures: i64,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new("price")
            .with_message("Course price must be non-negative".into()));
    }
    Ok(())
}

impl CreateCourseRequest {
    pub fn into_course(self, instructor_id: Uuid) -> Course {
        let now = Utc::now();
        Course {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            subtitle: self.subtitle.map(|s| s.trim().to_string()),
            description: self.description.map(|s| s.trim().to_string()),
            category: self.category.trim().to_string(),
            level: self.level,
            price: self.price,
            thumbnail: self.thumbnail,
            instructor_id,
            is_published: false,
            total_duration: self.total_duration,
            total_lectures: self.total_lectures,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(price: Decimal) -> CreateCourseRequest {
        CreateCourseRequest {
            title: "Rust for Backend Engineers".to_string(),
            subtitle: None,
            description: Some("Build services".to_string()),
            category: "programming".to_string(),
            level: CourseLevel::Intermediate,
            price,
            thumbnail: "uploads/thumb.png".to_string(),
            total_duration: 0,
            total_lectures: 0,
        }
    }

    #[test]
    fn test_negative_price_rejected() {
        assert!(request(Decimal::new(500, 0)).validate().is_ok());
        assert!(request(Decimal::ZERO).validate().is_ok());
        assert!(request(Decimal::new(-1, 0)).validate().is_err());
    }

    #[test]
    fn test_title_length_enforced() {
        let mut req = request(Decimal::ONE);
        req.title = "x".repeat(101);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_new_course_starts_unpublished() {
        let instructor = Uuid::new_v4();
        let course = request(Decimal::ONE).into_course(instructor);
        assert!(!course.is_published);
        assert_eq!(course.instructor_id, instructor);
        let summary = CourseSummary::from(&course);
        assert_eq!(summary.name, "Rust for Backend Engineers");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub avatar_public_id: Option<String>,
    pub bio: Option<String>,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl User {
    pub fn can_teach(&self) -> bool {
        matches!(self.role, UserRole::Instructor | UserRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub enrolled_courses: Vec<Enrollment>,
    pub total_enrolled_courses: usize,
}

/// Insert shape for the users table. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password needs at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    #[validate(length(max = 200, message = "Bio cannot exceed 200 characters"))]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password needs at least 8 characters"))]
    pub new_password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_validation() {
        let ok = SignupRequest {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            password: "longenough".to_string(),
            role: None,
        };
        assert!(ok.validate().is_ok());

        let short = SignupRequest { password: "short".to_string(), ..ok.clone() };
        assert!(short.validate().is_err());

        let bad_email = SignupRequest { email: "not-an-email".to_string(), ..ok };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_profile_update_bio_limit() {
        let update = ProfileUpdate { bio: Some("b".repeat(201)), ..Default::default() };
        assert!(update.validate().is_err());
        assert!(ProfileUpdate::default().validate().is_ok());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }
}

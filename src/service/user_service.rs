use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthService,
    domain::*,
    error::{AppError, Result},
    media::{classify_upload, MediaKind, MediaStore},
    repository::UserRepository,
};

/// An uploaded file as read from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    auth_service: Arc<AuthService>,
    media_store: Arc<dyn MediaStore>,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        auth_service: Arc<AuthService>,
        media_store: Arc<dyn MediaStore>,
    ) -> Self {
        Self { repo, auth_service, media_store }
    }

    /// Creates the account and opens a session. Returns the session token.
    pub async fn signup(&self, request: SignupRequest) -> Result<(User, String)> {
        request.validate()?;

        let role = request.role.unwrap_or_default();
        if role == UserRole::Admin {
            return Err(AppError::BadRequest("Admin accounts cannot be self-registered".to_string()));
        }

        if self.repo.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("User already exists with this email".to_string()));
        }

        let password_hash = AuthService::hash_password(&request.password).await?;
        let user = self.repo
            .create(NewUser {
                name: request.name,
                email: request.email,
                password_hash,
                role,
            })
            .await?;

        let (_session, token) = self.auth_service.create_session(user.id).await?;
        tracing::info!(user_id = %user.id, role = ?user.role, "User signed up");

        Ok((user, token))
    }

    pub async fn signin(&self, request: SigninRequest) -> Result<(User, String)> {
        request.validate()?;

        let password_hash = self.repo
            .get_password_hash(&request.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !AuthService::verify_password(&request.password, &password_hash).await? {
            return Err(AppError::Unauthorized);
        }

        let user = self.repo
            .find_by_email(&request.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        self.repo.touch_last_active(user.id).await?;
        let (_session, token) = self.auth_service.create_session(user.id).await?;

        Ok((user, token))
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile> {
        let user = self.repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let enrolled_courses = self.repo.list_enrollments(user_id).await?;

        Ok(UserProfile {
            total_enrolled_courses: enrolled_courses.len(),
            enrolled_courses,
            user,
        })
    }

    /// Applies field changes and, when a new avatar is supplied, swaps it in
    /// and removes the previous one from the media store. Every check runs
    /// before anything is written or uploaded.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
        avatar: Option<UploadedFile>,
    ) -> Result<User> {
        update.validate()?;

        if let Some(file) = avatar.as_ref() {
            let (kind, _) = classify_upload(&file.filename, file.data.len())?;
            if kind != MediaKind::Image {
                return Err(AppError::Validation("Avatar must be an image".to_string()));
            }
        }

        let existing = self.repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if let Some(email) = update.email.as_deref() {
            if let Some(other) = self.repo.find_by_email(email).await? {
                if other.id != user_id {
                    return Err(AppError::Conflict("Email is already in use".to_string()));
                }
            }
        }

        let asset = match avatar {
            Some(file) => Some(self.media_store.upload(&file.filename, &file.data).await?),
            None => None,
        };

        let mut user = match self.repo.update_profile(user_id, update).await {
            Ok(user) => user,
            Err(e) => {
                if let Some(asset) = asset.as_ref() {
                    self.discard_upload(user_id, &asset.public_id).await;
                }
                return Err(e);
            }
        };

        if let Some(asset) = asset {
            user = match self.repo.set_avatar(user_id, &asset.url, &asset.public_id).await {
                Ok(user) => user,
                Err(e) => {
                    self.discard_upload(user_id, &asset.public_id).await;
                    return Err(e);
                }
            };

            if let Some(old) = existing.avatar_public_id.as_deref() {
                self.discard_upload(user_id, old).await;
            }
        }

        Ok(user)
    }

    async fn discard_upload(&self, user_id: Uuid, public_id: &str) {
        if let Err(e) = self.media_store.delete(public_id, MediaKind::Image).await {
            tracing::error!(user_id = %user_id, public_id, error = %e, "Failed to delete avatar");
        }
    }

    /// Changes the password and signs out every other session.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_token: Option<&str>,
        change: PasswordChange,
    ) -> Result<()> {
        change.validate()?;

        let password_hash = self.repo
            .get_password_hash_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !AuthService::verify_password(&change.current_password, &password_hash).await? {
            return Err(AppError::BadRequest("Current password is incorrect".to_string()));
        }
        if change.current_password == change.new_password {
            return Err(AppError::BadRequest("New password must differ from the current one".to_string()));
        }

        let new_hash = AuthService::hash_password(&change.new_password).await?;
        self.repo.set_password_hash(user_id, &new_hash).await?;

        let dropped = self.auth_service
            .invalidate_other_sessions(user_id, current_token)
            .await?;
        tracing::info!(user_id = %user_id, dropped_sessions = dropped, "Password changed");

        Ok(())
    }
}

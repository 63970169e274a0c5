use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use serde_json::{json, Value};

use crate::{
    api::{middleware::auth::{session_token, CurrentUser}, state::AppState},
    auth::AuthService,
    domain::{PasswordChange, ProfileUpdate, SigninRequest, SignupRequest},
    error::{AppError, Result},
    service::UploadedFile,
};

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<Value>)> {
    let (user, token) = state.service_context.user_service.signup(req).await?;
    let cookie = state.service_context.auth_service.create_session_cookie(&token);

    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(json!({
            "success": true,
            "message": "Account created successfully",
            "user": user,
        })),
    ))
}

pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SigninRequest>,
) -> Result<(CookieJar, Json<Value>)> {
    let (user, token) = state.service_context.user_service.signin(req).await?;
    let cookie = state.service_context.auth_service.create_session_cookie(&token);

    Ok((
        jar.add(cookie),
        Json(json!({
            "success": true,
            "message": format!("Welcome back {}", user.name),
            "user": user,
        })),
    ))
}

pub async fn signout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>)> {
    if let Some(token) = session_token(&jar, &headers) {
        state.service_context.auth_service
            .invalidate_session(&token)
            .await?;
    }

    Ok((
        jar.add(AuthService::create_logout_cookie()),
        Json(json!({
            "success": true,
            "message": "Signed out successfully",
        })),
    ))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let profile = state.service_context.user_service
        .profile(current.user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "user": profile,
    })))
}

/// Multipart form: optional `name`, `email`, `bio` text fields and an
/// optional `avatar` (or `profilePhoto`) image.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let mut update = ProfileUpdate::default();
    let mut avatar: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "name" | "email" | "bio" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;
                let value = value.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match name.as_str() {
                    "name" => update.name = Some(value),
                    "email" => update.email = Some(value),
                    _ => update.bio = Some(value),
                }
            }
            "avatar" | "profilePhoto" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;
                if !filename.is_empty() && !data.is_empty() {
                    avatar = Some(UploadedFile { filename, data: data.to_vec() });
                }
            }
            _ => {}
        }
    }

    let user = state.service_context.user_service
        .update_profile(current.user.id, update, avatar)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": user,
    })))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<PasswordChange>,
) -> Result<Json<Value>> {
    state.service_context.user_service
        .change_password(current.user.id, Some(&current.token), req)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password changed successfully",
    })))
}

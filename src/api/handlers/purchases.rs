use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{CourseSummary, RefundRequest},
    error::{AppError, Result},
};

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let purchases = state.service_context.purchase_repo
        .find_by_user(current.user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "purchases": purchases,
    })))
}

pub async fn course_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let course = state.service_context.course_repo
        .find_by_id(course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    let purchased = state.service_context.purchase_repo
        .find_completed(current.user.id, course_id)
        .await?
        .is_some();

    Ok(Json(json!({
        "success": true,
        "course": CourseSummary::from(&course),
        "purchased": purchased,
    })))
}

pub async fn refund(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<Value>> {
    let purchase = state.checkout()?
        .refund(current.user.id, id, &req)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Refund processed",
        "purchase": purchase,
    })))
}

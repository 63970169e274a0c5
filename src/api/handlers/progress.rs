use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::LectureUpdate,
    error::Result,
};

pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let progress = state.service_context.progress_service
        .get(current.user.id, course_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "progress": progress,
    })))
}

pub async fn update_lecture(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((course_id, lecture_id)): Path<(Uuid, Uuid)>,
    Json(update): Json<LectureUpdate>,
) -> Result<Json<Value>> {
    let progress = state.service_context.progress_service
        .update_lecture(current.user.id, course_id, lecture_id, update)
        .await?;

    Ok(Json(json!({
        "success": true,
        "progress": progress,
    })))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{CreateCourseRequest, CreateReviewRequest},
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    20
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>> {
    let courses = state.service_context.course_service
        .list_published(params.limit, params.offset)
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": courses.len(),
        "courses": courses,
    })))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let course = state.service_context.course_service
        .create(&current.user, req)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "message": "Course created",
        "course": course,
    }))))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let course = state.service_context.course_service.detail(id).await?;

    Ok(Json(json!({
        "success": true,
        "course": course,
    })))
}

pub async fn publish(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let course = state.service_context.course_service
        .publish(&current.user, id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Course published",
        "course": course,
    })))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let reviews = state.service_context.review_service.list(id).await?;

    Ok(Json(json!({
        "success": true,
        "reviews": reviews,
    })))
}

pub async fn add_review(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let review = state.service_context.review_service
        .add(current.user.id, id, req)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "review": review,
    }))))
}

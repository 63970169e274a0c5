use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    error::{AppError, Result},
    media::MediaKind,
};

/// Multipart form with a single `file` field.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;

        let asset = state.service_context.media_store
            .upload(&filename, &data)
            .await?;

        return Ok((StatusCode::CREATED, Json(json!({
            "success": true,
            "message": "File uploaded successfully",
            "url": asset.url,
            "publicId": asset.public_id,
            "kind": asset.kind,
        }))));
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    kind: MediaKind,
}

pub async fn delete(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<Value>> {
    state.service_context.media_store
        .delete(&public_id, params.kind)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Media deleted",
    })))
}

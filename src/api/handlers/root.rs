use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::api::state::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Lectern API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Course marketplace backend",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "users": "/api/v1/user",
            "courses": "/api/v1/course",
            "checkout": "/api/v1/razorpay",
            "purchases": "/api/v1/purchase",
            "progress": "/api/v1/progress",
            "media": "/api/v1/media"
        }
    }))
}

/// Liveness plus a database round-trip. Answers 503 when the pool is gone.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = &state.service_context.database;
    let reachable = database.ping().await;

    let status = if reachable { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (status, Json(json!({
        "status": if reachable { "healthy" } else { "unhealthy" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "database": database.status(),
        "payments": state.checkout_service.is_some(),
        "media": state.service_context.media_store.name(),
    })))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({
        "status": "error",
        "message": "Route not found!"
    })))
}

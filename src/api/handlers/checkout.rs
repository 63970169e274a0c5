use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{CreateOrderRequest, PaymentVerification},
    error::Result,
};

pub async fn create_order(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<Value>> {
    let initiation = state.checkout()?
        .initiate_order(current.user.id, req.course_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "order": initiation.order,
        "course": initiation.course,
        "keyId": initiation.key_id,
    })))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<PaymentVerification>,
) -> Result<Json<Value>> {
    state.checkout()?
        .verify_payment(current.user.id, &req)
        .await?;

    Ok(Json(json!({
        "success": true,
        "verified": true,
    })))
}

pub mod handlers;
pub mod middleware;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};

use crate::{
    config::{ServerConfig, Settings},
    media::{MAX_IMAGE_SIZE, MAX_VIDEO_SIZE},
    service::{CheckoutService, ServiceContext},
};
use state::AppState;

/// Headroom for multipart boundaries and text fields around the file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_app(
    service_context: Arc<ServiceContext>,
    checkout_service: Option<Arc<CheckoutService>>,
    settings: Arc<Settings>,
) -> Router {
    let app_state = AppState::new(service_context, checkout_service, settings.clone());

    let mut api = api_routes(app_state.clone());
    if let Some((period_ms, burst)) = rate_limit_quota(&settings.server) {
        // Keyed on X-Forwarded-For / X-Real-IP, then the peer address
        match GovernorConfigBuilder::default()
            .per_millisecond(period_ms)
            .burst_size(burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
        {
            Some(config) => api = api.layer(GovernorLayer { config: Arc::new(config) }),
            None => tracing::warn!("Invalid rate limit settings; /api/v1 is not rate limited"),
        }
    }

    let mut app = Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        .nest("/api/v1", api)

        // Files written by the local media store
        .nest_service("/uploads", ServeDir::new(&settings.media.uploads_dir))

        .fallback(handlers::root::not_found)
        .with_state(app_state)

        // Middleware
        .layer(DefaultBodyLimit::max(settings.server.body_limit_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(settings.server.request_timeout_secs)))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&settings.server.client_url))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ));

    // HSTS only makes sense once the site is served over TLS
    if settings.auth.secure_cookies {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ));
    }

    app.layer(TraceLayer::new_for_http())
}

/// Replenish interval and burst for the per-client limiter, or `None` when disabled.
fn rate_limit_quota(server: &ServerConfig) -> Option<(u64, u32)> {
    if server.rate_limit_requests == 0 || server.rate_limit_window_secs == 0 {
        return None;
    }
    let period_ms = server.rate_limit_window_secs.saturating_mul(1000)
        / u64::from(server.rate_limit_requests);
    Some((period_ms.max(1), server.rate_limit_requests))
}

fn cors_layer(client_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(client_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Invalid client_url {:?} for CORS: {}", client_url, e);
            layer
        }
    }
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/user", user_routes(state.clone()))
        .nest("/course", course_routes(state.clone()))
        .nest("/razorpay", checkout_routes(state.clone()))
        .nest("/purchase", purchase_routes(state.clone()))
        .nest("/progress", progress_routes(state.clone()))
        .nest("/media", media_routes(state))
}

fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::users::signup))
        .route("/signin", post(handlers::users::signin))
        .route("/signout", post(handlers::users::signout))
        // Protected routes
        .merge(Router::new()
            .route("/profile", get(handlers::users::profile)
                .patch(handlers::users::update_profile)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + MULTIPART_OVERHEAD)))
            .route("/password", patch(handlers::users::change_password))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::auth::require_auth,
            ))
        )
}

fn course_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Public catalog
        .route("/", get(handlers::courses::list))
        .route("/:id", get(handlers::courses::get))
        .route("/:id/reviews", get(handlers::courses::list_reviews))
        // Instructor routes
        .merge(Router::new()
            .route("/", post(handlers::courses::create))
            .route("/:id/publish", post(handlers::courses::publish))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::auth::require_instructor,
            ))
        )
        // Enrolled students
        .merge(Router::new()
            .route("/:id/reviews", post(handlers::courses::add_review))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::auth::require_auth,
            ))
        )
}

fn checkout_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/create-order", post(handlers::checkout::create_order))
        .route("/verify-payment", post(handlers::checkout::verify_payment))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn purchase_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::purchases::list))
        .route("/course/:course_id", get(handlers::purchases::course_status))
        .route("/:id/refund", post(handlers::purchases::refund))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn progress_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:course_id", get(handlers::progress::get))
        .route("/:course_id/lectures/:lecture_id", patch(handlers::progress::update_lecture))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn media_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::media::upload)
            .layer(DefaultBodyLimit::max(MAX_VIDEO_SIZE + MULTIPART_OVERHEAD)))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ))
        .merge(Router::new()
            .route("/:public_id", delete(handlers::media::delete))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::auth::require_instructor,
            ))
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_quota() {
        let mut server = Settings::default().server;
        // 100 per 15 minutes replenishes one slot every 9 seconds
        assert_eq!(rate_limit_quota(&server), Some((9000, 100)));

        server.rate_limit_requests = 0;
        assert_eq!(rate_limit_quota(&server), None);

        server.rate_limit_requests = 5000;
        server.rate_limit_window_secs = 1;
        assert_eq!(rate_limit_quota(&server), Some((1, 5000)));
    }
}

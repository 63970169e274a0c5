use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::SESSION_COOKIE,
    domain::User,
    error::AppError,
};

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
    /// Token the request authenticated with.
    pub token: String,
}

/// Session token from the `session` cookie, falling back to a
/// `Bearer` authorization header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

async fn authenticate(state: &AppState, jar: &CookieJar, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let token = session_token(jar, headers).ok_or(AppError::Unauthorized)?;

    let session = state.service_context.auth_service
        .validate_session(&token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let user = state.service_context.user_repo
        .find_by_id(session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(CurrentUser { user, token })
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = authenticate(&state, &jar, request.headers()).await?;

    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

pub async fn require_instructor(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current = authenticate(&state, &jar, request.headers()).await?;

    if !current.user.can_teach() {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use cookie::Cookie;

    #[test]
    fn test_cookie_wins_over_header() {
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, "from-cookie"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_header_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(session_token(&CookieJar::new(), &headers).as_deref(), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(session_token(&CookieJar::new(), &headers), None);
    }
}

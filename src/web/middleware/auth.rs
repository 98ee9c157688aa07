use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::warn;

use crate::services::auth_service;
use crate::web::{AppState, error::AppError};

pub const AUTH_COOKIE: &str = "auth-token";

/// Pulls the token from the `Authorization: Bearer` header first, falling
/// back to the auth cookie set at login.
pub fn extract_token(
    authorization: Option<&str>,
    cookie_token: Option<&str>,
) -> Option<String> {
    authorization
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| cookie_token.map(|s| s.to_string()))
}

pub async fn auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());
    let cookie_token = jar.get(AUTH_COOKIE).map(|c| c.value().to_string());

    let token = extract_token(authorization, cookie_token.as_deref())
        .ok_or(AppError::Unauthorized)?;

    if !auth_service::verify_token(&token, &state.config.jwt_secret) {
        warn!("rejected request with invalid or expired token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_takes_priority_over_cookie() {
        assert_eq!(
            extract_token(Some("Bearer abc"), Some("def")),
            Some("abc".to_string())
        );
        assert_eq!(extract_token(None, Some("def")), Some("def".to_string()));
        assert_eq!(extract_token(None, None), None);
    }

    #[test]
    fn malformed_authorization_header_falls_back_to_cookie() {
        assert_eq!(
            extract_token(Some("Basic abc"), Some("def")),
            Some("def".to_string())
        );
        assert_eq!(extract_token(Some("Basic abc"), None), None);
    }
}

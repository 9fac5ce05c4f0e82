//! Resolves who is making a request.
//!
//! [`identity_middleware`] runs before every handler. It reads the session
//! token from the `session` cookie (or an `Authorization: Bearer` header),
//! checks it, and stores the signed-in [`User`] in the request extensions.
//! Handlers then take the identity as an explicit argument through the
//! [`CurrentUser`] or [`MaybeUser`] extractors.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, models::User, routes::AppState};

pub const SESSION_COOKIE: &str = "session";

/// Signed-in user placed in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub User);

/// Identity for routes that also serve anonymous visitors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaybeUser(pub Option<User>);

/// Session token carried by the request, if any
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value that stores a session token
pub fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// `Set-Cookie` value that removes the session
pub fn cleared_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user) = resolve_user(&state, request.headers()).await {
        request.extensions_mut().insert(CurrentUser(user));
    }
    next.run(request).await
}

/// Invalid, expired or orphaned sessions resolve to an anonymous visitor
async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = session_token(headers)?;
    let claims = state.sessions.verify(&token)?;
    let user_id = claims.user_id()?;

    match state.store.find_user(user_id).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            tracing::debug!(user_id, "Session refers to a missing user");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id, "Failed to resolve session user");
            None
        }
    }
}

/// Path and query the visitor asked for, to come back to after login
fn original_destination(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated {
                next: original_destination(parts),
            })
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<CurrentUser>().map(|u| u.0.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def.ghi; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sessionid=nope"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_cookie_values() {
        assert_eq!(
            session_cookie("tok", 60),
            "session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        assert!(cleared_session_cookie().contains("Max-Age=0"));
    }
}

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use super::response::ApiError;
use crate::auth::SESSION_TTL_SECS;
use crate::AppState;

pub const SESSION_COOKIE: &str = "image_vault_session";

/// Resolves the session cookie on a request to a username, if any.
pub fn session_user(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let value = cookie_value(headers, SESSION_COOKIE)?;
    state.auth.session_user(value)
}

/// `Set-Cookie` value establishing a session.
pub fn set_cookie(session: &str) -> String {
    format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECS}")
}

/// `Set-Cookie` value clearing the session.
pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Rejects requests that do not carry a valid session cookie.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if session_user(&state, request.headers()).is_none() {
        return Err(ApiError::unauthorized("Unauthorized"));
    }
    Ok(next.run(request).await)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .filter_map(|pair| pair.split_once('='))
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
}

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::auth_error;
use crate::api::response::{ApiError, AppJson};
use crate::api::session;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CredentialsRequest>,
) -> Result<Response, ApiError> {
    state
        .auth
        .register(&req.username, &req.password)
        .await
        .map_err(auth_error)?;

    tracing::info!(username = %req.username, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    )
        .into_response())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CredentialsRequest>,
) -> Result<Response, ApiError> {
    let grant = state
        .auth
        .login(&req.username, &req.password)
        .await
        .map_err(auth_error)?;

    tracing::debug!(username = %req.username, "Logged in");

    let mut response = Json(json!({ "token": grant.token })).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, header_value(&session::set_cookie(&grant.session))?);
    Ok(response)
}

pub async fn logout() -> Result<Response, ApiError> {
    let mut response = Redirect::to("/login.html").into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, header_value(&session::clear_cookie())?);
    Ok(response)
}

pub async fn current_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    match session::session_user(&state, &headers) {
        Some(username) => Json(json!({ "username": username })),
        None => Json(json!({})),
    }
}

fn header_value(value: &str) -> Result<header::HeaderValue, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::internal("Invalid Set-Cookie header"))
}

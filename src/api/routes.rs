use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, session};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;
    // Whole-body caps sit above the per-file limit so an oversized file
    // reaches the per-file check (413) instead of being cut off mid-parse.
    // The batch cap fits a full batch plus caption fields and framing.
    let single_limit = upload_limit.saturating_mul(2);
    let batch_limit = upload_limit.saturating_mul(handlers::MAX_BATCH_FILES + 1);

    let mut uploads = Router::new()
        .route(
            "/upload/single",
            post(handlers::upload_single).layer(DefaultBodyLimit::max(single_limit)),
        )
        .route(
            "/upload/multiple",
            post(handlers::upload_multiple).layer(DefaultBodyLimit::max(batch_limit)),
        );

    if state.config.auth.required {
        uploads = uploads.layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));
    } else {
        tracing::warn!("AUTH_REQUIRED disabled — upload routes are open.");
    }

    Router::new()
        // Auth
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/user", get(handlers::current_user))
        // Images
        .route("/images", get(handlers::list_images))
        .route("/files/*key", get(handlers::serve_file))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .merge(uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

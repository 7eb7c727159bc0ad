use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::response::ApiError;
use crate::blob_store::BlobStoreError;
use crate::AppState;

/// Serve stored blob content. Backs the URLs the local storage backend
/// hands out; S3-backed blobs are public and fetched from S3 directly.
/// Route: GET /files/*key
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.blob_store.get(&key).await.map_err(|e| match e {
        BlobStoreError::NotFound(_) => ApiError::not_found("File not found"),
        _ => ApiError::internal(format!("Failed to retrieve file: {e}")),
    })?;

    let mime_type = mime_guess::from_path(&key)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    // Cache for 1 hour (blobs are immutable once uploaded)
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}

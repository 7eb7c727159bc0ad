use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::response::ApiError;
use crate::images::{parse_tags, ImageListItem, IncomingFile, StoredImage, UploadFields};
use crate::AppState;

/// Upper bound on files per batch upload request.
pub const MAX_BATCH_FILES: usize = 10;

// ============================================================================
// Handlers
// ============================================================================

/// Route: POST /upload/single (multipart, file field `image`)
pub async fn upload_single(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<StoredImage>, ApiError> {
    let form = read_upload_form(&mut multipart, "image", state.config.max_upload_size).await?;

    if form.files.len() != 1 {
        return Err(ApiError::bad_request("exactly one image field is required"));
    }

    let mut stored = state
        .images
        .store_batch(form.files, &form.fields)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to upload image");
            ApiError::internal("Failed to upload images")
        })?;

    let image = stored
        .pop()
        .ok_or_else(|| ApiError::internal("Upload produced no result"))?;

    tracing::debug!(url = %image.image_url, "Uploaded image");
    Ok(Json(image))
}

/// Route: POST /upload/multiple (multipart, file field `images`, at most
/// [`MAX_BATCH_FILES`] files)
pub async fn upload_multiple(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<StoredImage>>, ApiError> {
    let form = read_upload_form(&mut multipart, "images", state.config.max_upload_size).await?;

    if form.files.len() > MAX_BATCH_FILES {
        return Err(ApiError::bad_request(format!(
            "at most {MAX_BATCH_FILES} images per request"
        )));
    }

    let stored = state
        .images
        .store_batch(form.files, &form.fields)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to upload image batch");
            ApiError::internal("Failed to upload images")
        })?;

    tracing::debug!(count = stored.len(), "Uploaded image batch");
    Ok(Json(stored))
}

/// Route: GET /images
pub async fn list_images(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImageListItem>>, ApiError> {
    let items = state
        .images
        .list()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list images");
            ApiError::internal("Failed to retrieve images")
        })?;

    Ok(Json(items))
}

// ============================================================================
// Helpers
// ============================================================================

struct UploadForm {
    files: Vec<IncomingFile>,
    fields: UploadFields,
}

/// Reads a multipart upload request: files from `file_field`, captions from
/// the `title`/`description`/`tags` text fields. Unknown fields are ignored.
async fn read_upload_form(
    multipart: &mut Multipart,
    file_field: &str,
    max_upload_size: u64,
) -> Result<UploadForm, ApiError> {
    let mut files = Vec::new();
    let mut fields = UploadFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            name if name == file_field => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let declared_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {max_upload_size} bytes"
                    )));
                }

                files.push(IncomingFile {
                    content_type: resolve_content_type(declared_type, &file_name),
                    file_name,
                    data,
                });
            }
            "title" => fields.title = text(field, "title").await?,
            "description" => fields.description = text(field, "description").await?,
            "tags" => fields.tags = parse_tags(&text(field, "tags").await?),
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(UploadForm { files, fields })
}

async fn text(field: Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid {name}: {e}")))
}

/// Determine MIME type: from multipart Content-Type, or guess from filename, or fallback
fn resolve_content_type(declared: Option<String>, file_name: &str) -> String {
    declared
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| {
            mime_guess::from_path(file_name)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

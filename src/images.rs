//! Image upload and listing flows.
//!
//! [`ImageService`] ties the two stores together: uploads write the raw
//! bytes to the blob store and a metadata record to the metadata store,
//! listings walk the blob store and join each key against its metadata.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use futures::future::{join_all, try_join_all};
use serde::Serialize;
use thiserror::Error;

use crate::blob_store::{BlobStore, BlobStoreError};
use crate::metadata_store::{ImageMetadata, MetadataStore, MetadataStoreError};

#[derive(Debug, Error)]
pub enum ImageServiceError {
    #[error("blob store: {0}")]
    Blob(#[from] BlobStoreError),
    #[error("metadata store: {0}")]
    Metadata(#[from] MetadataStoreError),
}

/// One file pulled out of a multipart request, fully buffered.
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Caption fields shared by every file in an upload request.
#[derive(Debug, Default)]
pub struct UploadFields {
    pub title: String,
    pub description: String,
    pub tags: BTreeSet<String>,
}

/// Upload response entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub image_url: String,
    pub title: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub upload_time: String,
}

/// Listing response entry. `metadata` falls back to empty fields when the
/// record is missing.
#[derive(Debug, Serialize)]
pub struct ImageListItem {
    pub key: String,
    pub url: String,
    pub metadata: ImageMetadataView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadataView {
    pub title: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub upload_time: String,
}

impl From<ImageMetadata> for ImageMetadataView {
    fn from(record: ImageMetadata) -> Self {
        Self {
            title: record.title,
            description: record.description,
            tags: record.tags,
            upload_time: record.upload_time,
        }
    }
}

pub struct ImageService {
    blob_store: Arc<dyn BlobStore>,
    metadata_store: Arc<dyn MetadataStore>,
}

impl ImageService {
    pub fn new(blob_store: Arc<dyn BlobStore>, metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self {
            blob_store,
            metadata_store,
        }
    }

    /// Stores a batch of files, all stamped with the same upload time.
    ///
    /// Each file is written to the blob store and then recorded in the
    /// metadata store; the per-file writes run concurrently. A failure
    /// anywhere fails the whole batch, and files already written stay
    /// written.
    pub async fn store_batch(
        &self,
        files: Vec<IncomingFile>,
        fields: &UploadFields,
    ) -> Result<Vec<StoredImage>, ImageServiceError> {
        let upload_time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let uploads = files.into_iter().map(|file| {
            let key = generate_key(Utc::now().timestamp_millis(), &file.file_name);
            let record = ImageMetadata {
                key: key.clone(),
                title: fields.title.clone(),
                description: fields.description.clone(),
                tags: fields.tags.clone(),
                upload_time: upload_time.clone(),
            };
            async move {
                self.blob_store
                    .put(&key, &file.content_type, file.data)
                    .await?;
                self.metadata_store.put_image(&record).await?;
                tracing::debug!("stored image {key}");

                Ok::<_, ImageServiceError>(StoredImage {
                    image_url: self.blob_store.url(&key),
                    title: record.title,
                    description: record.description,
                    tags: record.tags,
                    upload_time: record.upload_time,
                })
            }
        });

        try_join_all(uploads).await
    }

    /// Lists every blob in the store joined with its metadata record.
    ///
    /// A blob without a record (or whose lookup fails) still appears in
    /// the listing, with empty metadata fields.
    pub async fn list(&self) -> Result<Vec<ImageListItem>, ImageServiceError> {
        let keys = self.blob_store.list_keys().await?;

        let lookups = keys.iter().map(|key| self.metadata_store.get_image(key));
        let results = join_all(lookups).await;

        let items = keys
            .into_iter()
            .zip(results)
            .map(|(key, result)| {
                let record = match result {
                    Ok(Some(record)) => record,
                    Ok(None) => ImageMetadata::missing(&key),
                    Err(e) => {
                        tracing::warn!("metadata lookup for {key} failed: {e}");
                        ImageMetadata::missing(&key)
                    }
                };
                ImageListItem {
                    url: self.blob_store.url(&key),
                    key,
                    metadata: record.into(),
                }
            })
            .collect();

        Ok(items)
    }
}

/// Builds a blob key from the upload instant and the client file name.
///
/// Only the final path segment of the name is kept, so a name like
/// `../../etc/passwd` cannot steer the key outside the store.
pub fn generate_key(timestamp_millis: i64, original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    format!("{timestamp_millis}-{base}")
}

/// Splits a comma-separated tag field into a set, dropping blanks.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

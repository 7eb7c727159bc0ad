mod local;
mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over blob storage backends.
/// Keys are `{millis}-{filename}` strings generated at upload time; the
/// descriptive metadata lives in the metadata store under the same key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> Result<(), BlobStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, BlobStoreError>;
    /// Enumerate every key in the store. A single unpaginated call; callers
    /// assume one page covers the bucket.
    async fn list_keys(&self) -> Result<Vec<String>, BlobStoreError>;
    /// Public location for a stored blob, derived from key and store
    /// configuration. Nothing is persisted for this.
    fn url(&self, key: &str) -> String;
}

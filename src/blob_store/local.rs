use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::{BlobStore, BlobStoreError};

/// Local filesystem blob store for development and testing. Served urls
/// point back at this process's `/files/` route.
pub struct LocalStore {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P, public_base_url: &str) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Keys map to file names directly. Anything that could point outside
    /// the storage directory is treated as absent.
    fn object_path(&self, key: &str) -> Result<PathBuf, BlobStoreError> {
        if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
            return Err(BlobStoreError::NotFound(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn put(&self, key: &str, _content_type: &str, data: Bytes) -> Result<(), BlobStoreError> {
        let path = self.object_path(key)?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, BlobStoreError> {
        let path = self.object_path(key)?;
        if !path.exists() {
            return Err(BlobStoreError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn list_keys(&self) -> Result<Vec<String>, BlobStoreError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        // Match the lexicographic order S3 listings come back in
        keys.sort();
        Ok(keys)
    }

    fn url(&self, key: &str) -> String {
        format!("{}/files/{key}", self.public_base_url)
    }
}

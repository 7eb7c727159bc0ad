mod dynamo;
mod local;
pub mod models;
mod tables;

pub use dynamo::DynamoStore;
pub use local::RedbStore;
pub use models::{ImageMetadata, UserRecord};
pub use tables::*;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataStoreError {
    #[error("Record already exists: {0}")]
    AlreadyExists(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Commit error: {0}")]
    Commit(Box<redb::CommitError>),
    #[error("Database error: {0}")]
    Database(Box<redb::DatabaseError>),
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),
    #[error("Storage error: {0}")]
    Storage(Box<redb::StorageError>),
    #[error("Table error: {0}")]
    Table(Box<redb::TableError>),
    #[error("Transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
}

impl From<redb::CommitError> for MetadataStoreError {
    fn from(e: redb::CommitError) -> Self {
        MetadataStoreError::Commit(Box::new(e))
    }
}

impl From<redb::DatabaseError> for MetadataStoreError {
    fn from(e: redb::DatabaseError) -> Self {
        MetadataStoreError::Database(Box::new(e))
    }
}

impl From<redb::StorageError> for MetadataStoreError {
    fn from(e: redb::StorageError) -> Self {
        MetadataStoreError::Storage(Box::new(e))
    }
}

impl From<redb::TableError> for MetadataStoreError {
    fn from(e: redb::TableError) -> Self {
        MetadataStoreError::Table(Box::new(e))
    }
}

impl From<redb::TransactionError> for MetadataStoreError {
    fn from(e: redb::TransactionError) -> Self {
        MetadataStoreError::Transaction(Box::new(e))
    }
}

/// Abstraction over the metadata database. Image rows are keyed by blob
/// key, user rows by username; rows are never deleted.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn put_image(&self, record: &ImageMetadata) -> Result<(), MetadataStoreError>;
    async fn get_image(&self, key: &str) -> Result<Option<ImageMetadata>, MetadataStoreError>;
    async fn scan_images(&self) -> Result<Vec<ImageMetadata>, MetadataStoreError>;
    /// Insert a new account. Fails with `AlreadyExists` when the username
    /// is taken.
    async fn create_user(&self, user: &UserRecord) -> Result<(), MetadataStoreError>;
    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>, MetadataStoreError>;
}

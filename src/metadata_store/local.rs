use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable};

use super::models::{ImageMetadata, UserRecord};
use super::tables::*;
use super::{MetadataStore, MetadataStoreError};

/// Embedded metadata store for development and testing, backed by redb.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database under the given data directory.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, MetadataStoreError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("image-vault.redb");
        let db = Arc::new(Database::create(db_path)?);

        // Initialize tables up front so reads never hit a missing table
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(IMAGES)?;
            let _ = write_txn.open_table(USERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

#[async_trait]
impl MetadataStore for RedbStore {
    async fn put_image(&self, record: &ImageMetadata) -> Result<(), MetadataStoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(IMAGES)?;
            let data = rmp_serde::to_vec_named(record)?;
            table.insert(record.key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn get_image(&self, key: &str) -> Result<Option<ImageMetadata>, MetadataStoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IMAGES)?;

        match table.get(key)? {
            Some(data) => {
                let record: ImageMetadata = rmp_serde::from_slice(data.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn scan_images(&self) -> Result<Vec<ImageMetadata>, MetadataStoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(IMAGES)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let record: ImageMetadata = rmp_serde::from_slice(value.value())?;
            records.push(record);
        }

        Ok(records)
    }

    async fn create_user(&self, user: &UserRecord) -> Result<(), MetadataStoreError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            if table.get(user.username.as_str())?.is_some() {
                return Err(MetadataStoreError::AlreadyExists(user.username.clone()));
            }
            let data = rmp_serde::to_vec_named(user)?;
            table.insert(user.username.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn get_user(&self, username: &str) -> Result<Option<UserRecord>, MetadataStoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(username)? {
            Some(data) => {
                let user: UserRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

//! image-vault - An image hosting backend with captioned uploads
//!
//! This crate provides authenticated image uploads, caption metadata, and
//! a combined listing API with:
//! - Swappable blob storage backends (local filesystem, Amazon S3)
//! - Swappable metadata backends (redb embedded database, Amazon DynamoDB)
//! - Username/password accounts gated by signed session cookies
//! - REST API with multipart upload support

pub mod api;
pub mod auth;
pub mod aws;
pub mod blob_store;
pub mod config;
pub mod images;
pub mod metadata_store;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use auth::AuthGate;
use blob_store::BlobStore;
use config::Config;
use images::ImageService;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub blob_store: Arc<dyn BlobStore>,
    pub images: ImageService,
    pub auth: AuthGate,
}

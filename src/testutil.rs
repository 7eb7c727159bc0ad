//! Shared test helpers for image-vault integration tests.

use std::sync::Arc;

use crate::auth::AuthGate;
use crate::blob_store::{BlobStore, LocalStore};
use crate::config::{AuthConfig, Config, ServerConfig, StorageConfig};
use crate::images::ImageService;
use crate::metadata_store::{MetadataStore, RedbStore};
use crate::AppState;

/// Create a test AppState with a temporary metadata database and local
/// blob store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    test_state_with(temp_dir, true, 10 * 1024 * 1024) // 10MB for tests
}

/// Like [`test_state`], with the auth toggle and upload cap chosen by the
/// caller.
pub fn test_state_with(
    temp_dir: &tempfile::TempDir,
    auth_required: bool,
    max_upload_size: u64,
) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        },
        auth: AuthConfig {
            required: auth_required,
            session_secret: "test-session-secret".to_string(),
            token_secret: "test-token-secret".to_string(),
        },
        storage: StorageConfig::default(),
        max_upload_size,
    };

    let blob_store: Arc<dyn BlobStore> = Arc::new(
        LocalStore::new(&files_dir, &config.server.public_base_url)
            .expect("Failed to create test blob store"),
    );
    let metadata_store: Arc<dyn MetadataStore> =
        Arc::new(RedbStore::open(&data_dir).expect("Failed to open test metadata store"));

    Arc::new(AppState {
        blob_store: Arc::clone(&blob_store),
        images: ImageService::new(blob_store, Arc::clone(&metadata_store)),
        auth: AuthGate::new(
            metadata_store,
            &config.auth.session_secret,
            &config.auth.token_secret,
        ),
        config,
    })
}

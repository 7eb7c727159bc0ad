use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_vault::{
    api,
    auth::AuthGate,
    aws::AwsCredentials,
    blob_store::{BlobStore, LocalStore, S3Store},
    config::{Config, StorageBackend},
    images::ImageService,
    metadata_store::{DynamoStore, MetadataStore, RedbStore},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "image-vault starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize storage backends
    let (blob_store, metadata_store): (Arc<dyn BlobStore>, Arc<dyn MetadataStore>) =
        match config.storage.backend {
            StorageBackend::Local => {
                let blobs = LocalStore::new(
                    &config.storage.local_storage_path,
                    &config.server.public_base_url,
                )?;
                let metadata = RedbStore::open(&config.storage.data_dir)?;
                info!(
                    "Using local storage backend at: {} (metadata at: {})",
                    config.storage.local_storage_path, config.storage.data_dir
                );
                (Arc::new(blobs), Arc::new(metadata))
            }
            StorageBackend::Aws => {
                let region = config
                    .storage
                    .region
                    .as_deref()
                    .expect("AWS_REGION validated in config");
                let bucket = config
                    .storage
                    .bucket
                    .as_deref()
                    .expect("S3_BUCKET_NAME validated in config");
                let credentials = AwsCredentials {
                    access_key_id: config
                        .storage
                        .access_key_id
                        .clone()
                        .expect("AWS_ACCESS_KEY_ID validated in config"),
                    secret_access_key: config
                        .storage
                        .secret_access_key
                        .clone()
                        .expect("AWS_SECRET_ACCESS_KEY validated in config"),
                };

                let blobs = S3Store::new(bucket, region, credentials.clone())?;
                let metadata = DynamoStore::new(
                    region,
                    credentials,
                    &config.storage.image_table,
                    &config.storage.user_table,
                )?;
                info!("Using AWS storage backend, bucket: {}", bucket);
                (Arc::new(blobs), Arc::new(metadata))
            }
        };

    // Create shared state
    let state = Arc::new(AppState {
        blob_store: Arc::clone(&blob_store),
        images: ImageService::new(blob_store, Arc::clone(&metadata_store)),
        auth: AuthGate::new(
            metadata_store,
            &config.auth.session_secret,
            &config.auth.token_secret,
        ),
        config,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&state.config.server.bind_address).await?;
    info!("Listening on: {}", state.config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

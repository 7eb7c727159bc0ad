use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    /// Maximum size of a single uploaded file in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Base URL clients can reach this server on. Used to build file URLs
    /// for the local storage backend.
    pub public_base_url: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    /// When false, upload routes skip the session check entirely.
    pub required: bool,
    pub session_secret: String,
    pub token_secret: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("required", &self.required)
            .field("session_secret", &"<redacted>")
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Aws,
    Local,
}

#[derive(Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for blobs under the local backend
    pub local_storage_path: String,
    /// Directory for the embedded metadata database under the local backend
    pub data_dir: String,
    /// AWS settings (required when backend is aws)
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket: Option<String>,
    pub image_table: String,
    pub user_table: String,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("local_storage_path", &self.local_storage_path)
            .field("data_dir", &self.data_dir)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("bucket", &self.bucket)
            .field("image_table", &self.image_table)
            .field("user_table", &self.user_table)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            data_dir: "./data".to_string(),
            region: None,
            access_key_id: None,
            secret_access_key: None,
            bucket: None,
            image_table: "image_info".to_string(),
            user_table: "users".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let auth_required = std::env::var("AUTH_REQUIRED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let session_secret = std::env::var("SESSION_SECRET").unwrap_or_default();
        let token_secret = std::env::var("JWT_SECRET").unwrap_or_default();

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "aws" => StorageBackend::Aws,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let region = std::env::var("AWS_REGION").ok();
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok();
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok();
        let bucket = std::env::var("S3_BUCKET_NAME").ok();

        let image_table = std::env::var("IMAGE_TABLE").unwrap_or_else(|_| "image_info".to_string());
        let user_table = std::env::var("USER_TABLE").unwrap_or_else(|_| "users".to_string());

        let config = Config {
            server: ServerConfig {
                bind_address,
                public_base_url,
            },
            auth: AuthConfig {
                required: auth_required,
                session_secret,
                token_secret,
            },
            storage: StorageConfig {
                backend: storage_backend,
                local_storage_path,
                data_dir,
                region,
                access_key_id,
                secret_access_key,
                bucket,
                image_table,
                user_table,
            },
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.session_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "SESSION_SECRET cannot be empty".to_string(),
            ));
        }

        if self.auth.token_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "JWT_SECRET cannot be empty".to_string(),
            ));
        }

        if matches!(self.storage.backend, StorageBackend::Aws) {
            for (value, name) in [
                (&self.storage.region, "AWS_REGION"),
                (&self.storage.access_key_id, "AWS_ACCESS_KEY_ID"),
                (&self.storage.secret_access_key, "AWS_SECRET_ACCESS_KEY"),
                (&self.storage.bucket, "S3_BUCKET_NAME"),
            ] {
                if value.is_none() {
                    return Err(ConfigError::ValidationError(format!(
                        "{name} is required when STORAGE_BACKEND=aws"
                    )));
                }
            }
        }

        Ok(())
    }
}

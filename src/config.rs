use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "text/plain",
    "text/csv",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Directory holding the redb database file
    pub data_dir: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens
    pub token_secret: String,
    pub token_expire_minutes: i64,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"<redacted>")
            .field("token_expire_minutes", &self.token_expire_minutes)
            .finish()
    }
}

/// Boundary policy applied to uploads before they reach the document service.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
    pub allowed_content_types: Vec<String>,
}

/// Tag identifying where a document's bytes live.
///
/// The tag is persisted on every document as a plain string, so a document
/// stays readable after the deployment's default backend changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageBackend {
    Local,
    S3,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::S3 => "s3",
        }
    }

    /// Strict lookup of a persisted tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "local" => Some(StorageBackend::Local),
            "s3" => Some(StorageBackend::S3),
            _ => None,
        }
    }

    /// Lenient lookup used for configuration; anything unrecognized falls back to local.
    pub fn from_config(value: &str) -> Self {
        match Self::from_tag(value.trim().to_lowercase().as_str()) {
            Some(backend) => backend,
            None => {
                tracing::warn!(
                    configured = value,
                    "Unknown STORAGE_BACKEND, falling back to local"
                );
                StorageBackend::Local
            }
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Backend used for new uploads
    pub backend: StorageBackend,
    /// Root directory for the local backend
    pub local_storage_path: String,
    /// S3 settings; the s3 backend is available whenever this is set
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores (MinIO, localstack)
    pub endpoint: Option<String>,
    pub force_path_style: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./documents".to_string(),
            s3: None,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 10 * 1024 * 1024, // 10MB
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_defaults = ServerConfig::default();
        let bind_address = lookup("BIND_ADDRESS").unwrap_or(server_defaults.bind_address);
        let data_dir = lookup("DATA_DIR").unwrap_or(server_defaults.data_dir);

        let backend = StorageBackend::from_config(
            &lookup("STORAGE_BACKEND").unwrap_or_else(|| "local".to_string()),
        );
        let local_storage_path =
            lookup("LOCAL_STORAGE_PATH").unwrap_or_else(|| "./documents".to_string());

        let s3 = lookup("S3_BUCKET")
            .filter(|b| !b.trim().is_empty())
            .map(|bucket| S3Config {
                bucket,
                endpoint: lookup("S3_ENDPOINT").filter(|e| !e.is_empty()),
                force_path_style: lookup("S3_FORCE_PATH_STYLE")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
            });

        let upload_defaults = UploadConfig::default();
        let max_upload_size = lookup("MAX_UPLOAD_SIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(upload_defaults.max_upload_size);
        let allowed_content_types = lookup("ALLOWED_CONTENT_TYPES")
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(upload_defaults.allowed_content_types);

        let token_secret = lookup("TOKEN_SECRET_KEY").unwrap_or_default();
        let token_expire_minutes = lookup("TOKEN_EXPIRE_MINUTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let config = Config {
            auth: AuthConfig {
                token_secret,
                token_expire_minutes,
            },
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                backend,
                local_storage_path,
                s3,
            },
            upload: UploadConfig {
                max_upload_size,
                allowed_content_types,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "TOKEN_SECRET_KEY cannot be empty".to_string(),
            ));
        }

        if self.auth.token_expire_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "TOKEN_EXPIRE_MINUTES must be positive".to_string(),
            ));
        }

        if matches!(self.storage.backend, StorageBackend::S3) && self.storage.s3.is_none() {
            return Err(ConfigError::ValidationError(
                "S3_BUCKET is required when STORAGE_BACKEND=s3".to_string(),
            ));
        }

        if self.upload.allowed_content_types.is_empty() {
            tracing::warn!("ALLOWED_CONTENT_TYPES is empty; every upload will be rejected");
        }

        Ok(())
    }

    /// Whether a content type passes the upload policy. Parameters such as
    /// `; charset=utf-8` are ignored.
    pub fn is_allowed_content_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        self.upload
            .allowed_content_types
            .iter()
            .any(|allowed| *allowed == essence)
    }
}

mod local;
mod normalize;
mod s3;

pub use local::LocalStore;
pub use normalize::{normalize_filename, UNNAMED_FILE};
pub use s3::S3Store;

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::io::AsyncRead;
use uuid::Uuid;

use crate::config::StorageBackend;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Canonical metadata returned after bytes are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Normalized filename
    pub file_name: String,
    pub content_type: String,
    /// Filesystem path or object key, interpreted by `backend`
    pub storage_path: String,
    pub backend: StorageBackend,
}

pub enum DownloadBody {
    /// Direct handle on a local file
    File(tokio::fs::File),
    /// Byte stream from a remote object store
    Stream(Pin<Box<dyn AsyncRead + Send>>),
}

impl fmt::Debug for DownloadBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadBody::File(file) => f.debug_tuple("File").field(file).finish(),
            DownloadBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

#[derive(Debug)]
pub struct Download {
    pub body: DownloadBody,
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
}

/// Storage capability shared by every backend.
///
/// Paths are namespaced by project id, so two projects never collide.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn backend(&self) -> StorageBackend;

    /// Normalize `file_name` and write `data` under the project's namespace,
    /// overwriting any previous object with the same normalized name.
    async fn save(
        &self,
        project_id: Uuid,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredFile, ObjectStoreError>;

    /// Remove the object and, when its project container is left empty, the container too.
    async fn remove(&self, storage_path: &str) -> Result<(), ObjectStoreError>;

    async fn download(&self, storage_path: &str) -> Result<Download, ObjectStoreError>;
}

/// Directory or key prefix holding a project's documents.
pub fn project_prefix(project_id: Uuid) -> String {
    project_id.simple().to_string()
}

/// Process-wide set of storage backends, resolved once at startup.
#[derive(Clone)]
pub struct StorageRegistry {
    default: StorageBackend,
    local: Arc<dyn ObjectStore>,
    s3: Option<Arc<dyn ObjectStore>>,
}

impl StorageRegistry {
    pub fn new(
        default: StorageBackend,
        local: Arc<dyn ObjectStore>,
        s3: Option<Arc<dyn ObjectStore>>,
    ) -> Result<Self, ObjectStoreError> {
        if default == StorageBackend::S3 && s3.is_none() {
            return Err(ObjectStoreError::Backend(
                "s3 is the default backend but no s3 store is configured".to_string(),
            ));
        }
        Ok(Self { default, local, s3 })
    }

    pub fn default_backend(&self) -> StorageBackend {
        self.default
    }

    /// Store that receives new uploads.
    pub fn default_store(&self) -> &Arc<dyn ObjectStore> {
        match self.default {
            StorageBackend::Local => &self.local,
            StorageBackend::S3 => self.s3.as_ref().unwrap_or(&self.local),
        }
    }

    pub fn get(&self, backend: StorageBackend) -> Option<&Arc<dyn ObjectStore>> {
        match backend {
            StorageBackend::Local => Some(&self.local),
            StorageBackend::S3 => self.s3.as_ref(),
        }
    }

    /// Resolve a persisted backend tag. `None` when the tag is unknown or the
    /// backend is not configured in this deployment.
    pub fn for_tag(&self, tag: &str) -> Option<&Arc<dyn ObjectStore>> {
        StorageBackend::from_tag(tag).and_then(|backend| self.get(backend))
    }
}

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{
    normalize_filename, project_prefix, Download, DownloadBody, ObjectStore, ObjectStoreError,
    StoredFile,
};
use crate::config::StorageBackend;

/// Local filesystem store. Documents live at `<base>/<project hex>/<normalized name>`.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn project_dir(&self, project_id: Uuid) -> PathBuf {
        self.base_path.join(project_prefix(project_id))
    }
}

async fn is_empty_dir(path: &Path) -> Result<bool, std::io::Error> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    Ok(entries.next_entry().await?.is_none())
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn save(
        &self,
        project_id: Uuid,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredFile, ObjectStoreError> {
        let file_name = normalize_filename(file_name);
        let dir = self.project_dir(project_id);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(&file_name);
        tokio::fs::write(&path, &data).await?;

        Ok(StoredFile {
            file_name,
            content_type: content_type.to_string(),
            storage_path: path.to_string_lossy().into_owned(),
            backend: StorageBackend::Local,
        })
    }

    async fn remove(&self, storage_path: &str) -> Result<(), ObjectStoreError> {
        let path = Path::new(storage_path);

        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(storage_path, "File to remove does not exist");
            }
            Err(e) => return Err(e.into()),
        }

        // Drop the project directory once its last document is gone
        if let Some(parent) = path.parent() {
            if parent != self.base_path && is_empty_dir(parent).await? {
                if let Err(e) = tokio::fs::remove_dir(parent).await {
                    tracing::debug!(dir = %parent.display(), error = %e, "Could not remove project directory");
                }
            }
        }

        Ok(())
    }

    async fn download(&self, storage_path: &str) -> Result<Download, ObjectStoreError> {
        let file = match tokio::fs::File::open(storage_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ObjectStoreError::NotFound(storage_path.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        Ok(Download {
            body: DownloadBody::File(file),
            content_length: Some(metadata.len()),
            last_modified,
            content_type: mime_guess::from_path(storage_path)
                .first()
                .map(|m| m.to_string()),
        })
    }
}

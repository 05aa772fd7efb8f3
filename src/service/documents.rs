use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use super::policy::{can_read, can_write};
use super::projects::ProjectService;
use super::{
    supplied, validate_document_description, validate_document_name, DocumentError, ProjectError,
};
use crate::object_store::{
    normalize_filename, Download, ObjectStoreError, StorageRegistry, StoredFile,
};
use crate::storage::models::{DocumentRecord, Role};
use crate::storage::Repository;

/// File bytes accepted at the boundary, before normalization.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Optional document fields. Empty strings count as not supplied.
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl DocumentUpdate {
    fn normalized(self) -> Self {
        Self {
            name: supplied(self.name),
            description: supplied(self.description),
        }
    }

    fn validate(&self) -> Result<(), DocumentError> {
        if let Some(name) = &self.name {
            validate_document_name(name).map_err(DocumentError::Validation)?;
        }
        if let Some(description) = &self.description {
            validate_document_description(description).map_err(DocumentError::Validation)?;
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Document lifecycle: upload, update, delete, download and listing.
#[derive(Clone)]
pub struct DocumentService {
    repo: Arc<dyn Repository>,
    storage: StorageRegistry,
    projects: ProjectService,
}

impl DocumentService {
    pub fn new(repo: Arc<dyn Repository>, storage: StorageRegistry, projects: ProjectService) -> Self {
        Self {
            repo,
            storage,
            projects,
        }
    }

    /// Store a file in the default backend and record it on the project.
    ///
    /// A file whose normalized name already exists in the project overwrites
    /// that document's storage pointer and merges the supplied details.
    pub async fn upload_document(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        upload: Upload,
        details: DocumentUpdate,
    ) -> Result<DocumentRecord, DocumentError> {
        let details = details.normalized();
        details.validate()?;
        self.projects.get_project(project_id, user_id)?;

        let stored = self.save_bytes(project_id, upload).await?;

        let existing = self
            .repo
            .get_document_by_filename(project_id, &stored.file_name)
            .map_err(|e| DocumentError::Retrieve(e.to_string()))?;

        match existing {
            Some(mut document) => {
                apply_stored(&mut document, &stored);
                apply_details(&mut document, details);

                let saved = self
                    .repo
                    .save_document(&document)
                    .map_err(|e| DocumentError::Create(e.to_string()))?
                    .ok_or(DocumentError::NotFound(document.id))?;

                tracing::info!(
                    project_id = %project_id,
                    document_id = %saved.id,
                    storage_path = %saved.storage_path,
                    "Overwrote document"
                );
                Ok(saved)
            }
            None => {
                let document = DocumentRecord {
                    id: Uuid::new_v4(),
                    project_id,
                    file_name: stored.file_name,
                    content_type: stored.content_type,
                    storage_path: stored.storage_path,
                    storage_backend: stored.backend.as_str().to_string(),
                    name: details.name.unwrap_or_default(),
                    description: details.description.unwrap_or_default(),
                    created_at: Utc::now(),
                    updated_at: None,
                };

                self.repo
                    .create_document(&document)
                    .map_err(|e| DocumentError::Create(e.to_string()))?;

                tracing::info!(
                    project_id = %project_id,
                    document_id = %document.id,
                    storage_path = %document.storage_path,
                    "Created document"
                );
                Ok(document)
            }
        }
    }

    /// Update a document's details and optionally replace its file.
    ///
    /// The new bytes are written and the record persisted before the previous
    /// bytes are removed through the backend they were stored in. A replacement
    /// whose normalized name belongs to another document is rejected before any
    /// bytes are written.
    pub async fn update_document(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        details: DocumentUpdate,
        file: Option<Upload>,
    ) -> Result<DocumentRecord, DocumentError> {
        let details = details.normalized();
        if details.is_empty() && file.is_none() {
            return Err(DocumentError::EmptyUpdate);
        }
        details.validate()?;

        let mut document = self.get_document(document_id, user_id)?;
        if let Some(upload) = &file {
            self.ensure_file_name_free(&document, &upload.file_name)?;
        }
        let previous = (document.storage_backend.clone(), document.storage_path.clone());

        if let Some(upload) = file {
            let stored = self.save_bytes(document.project_id, upload).await?;
            document.file_name = stored.file_name.clone();
            apply_stored(&mut document, &stored);
        }
        apply_details(&mut document, details);

        let saved = self
            .repo
            .save_document(&document)
            .map_err(|e| DocumentError::Create(e.to_string()))?
            .ok_or(DocumentError::NotFound(document_id))?;

        let (old_backend, old_path) = previous;
        if (old_backend.as_str(), old_path.as_str())
            != (saved.storage_backend.as_str(), saved.storage_path.as_str())
        {
            self.remove_bytes(document_id, &old_backend, &old_path).await;
        }

        tracing::debug!(document_id = %document_id, "Updated document");
        Ok(saved)
    }

    /// Delete the record, then the bytes. Only project owners may delete.
    pub async fn delete_document(&self, document_id: Uuid, user_id: Uuid) -> Result<(), DocumentError> {
        let (document, role) = self.load_with_role(document_id, user_id)?;
        if !can_read(role) {
            return Err(DocumentError::AccessDenied);
        }
        if !can_write(role) {
            return Err(DocumentError::PermissionDenied);
        }

        let deleted = self
            .repo
            .delete_document(document_id)
            .map_err(|e| DocumentError::Delete(e.to_string()))?;
        if !deleted {
            return Err(DocumentError::NotFound(document_id));
        }

        self.remove_bytes(document_id, &document.storage_backend, &document.storage_path)
            .await;

        tracing::info!(document_id = %document_id, "Deleted document");
        Ok(())
    }

    /// Open a document's bytes through the backend recorded on the document.
    pub async fn download_document(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> Result<(DocumentRecord, Download), DocumentError> {
        let document = self.get_document(document_id, user_id)?;

        let store = self
            .storage
            .for_tag(&document.storage_backend)
            .ok_or_else(|| DocumentError::UnsupportedBackend(document.storage_backend.clone()))?;

        let download = store
            .download(&document.storage_path)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound(_) => DocumentError::FileMissing(document_id),
                e => DocumentError::StorageRead(e.to_string()),
            })?;

        Ok((document, download))
    }

    pub fn get_document(&self, document_id: Uuid, user_id: Uuid) -> Result<DocumentRecord, DocumentError> {
        let (document, role) = self.load_with_role(document_id, user_id)?;
        if !can_read(role) {
            return Err(DocumentError::AccessDenied);
        }
        Ok(document)
    }

    /// Documents of a project the caller participates in. Anyone else gets an
    /// empty list.
    pub fn list_documents(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<DocumentRecord>, DocumentError> {
        let role = self
            .repo
            .get_role(project_id, user_id)
            .map_err(|e| ProjectError::RoleRead(e.to_string()))?;
        if !can_read(role) {
            return Ok(Vec::new());
        }

        self.repo
            .list_documents_by_project(project_id)
            .map_err(|e| DocumentError::Retrieve(e.to_string()))
    }

    fn load_with_role(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> Result<(DocumentRecord, Option<Role>), DocumentError> {
        let document = self
            .repo
            .get_document(document_id)
            .map_err(|e| DocumentError::Retrieve(e.to_string()))?
            .ok_or(DocumentError::NotFound(document_id))?;

        let role = self
            .repo
            .get_role(document.project_id, user_id)
            .map_err(|e| ProjectError::RoleRead(e.to_string()))?;

        Ok((document, role))
    }

    /// A replacement file may keep its own name but not take another document's.
    fn ensure_file_name_free(
        &self,
        document: &DocumentRecord,
        file_name: &str,
    ) -> Result<(), DocumentError> {
        let file_name = normalize_filename(file_name);
        let holder = self
            .repo
            .get_document_by_filename(document.project_id, &file_name)
            .map_err(|e| DocumentError::Retrieve(e.to_string()))?;

        match holder {
            Some(other) if other.id != document.id => Err(DocumentError::FileNameTaken(file_name)),
            _ => Ok(()),
        }
    }

    async fn save_bytes(&self, project_id: Uuid, upload: Upload) -> Result<StoredFile, DocumentError> {
        self.storage
            .default_store()
            .save(project_id, &upload.file_name, &upload.content_type, upload.data)
            .await
            .map_err(|e| {
                tracing::error!(project_id = %project_id, error = %e, "Failed to store file");
                DocumentError::StorageWrite(e.to_string())
            })
    }

    /// Best-effort removal after the database has committed.
    async fn remove_bytes(&self, document_id: Uuid, backend: &str, storage_path: &str) {
        let Some(store) = self.storage.for_tag(backend) else {
            tracing::warn!(
                document_id = %document_id,
                backend = backend,
                storage_path = storage_path,
                "No storage backend for document, leaving bytes in place"
            );
            return;
        };

        if let Err(e) = store.remove(storage_path).await {
            tracing::error!(
                document_id = %document_id,
                storage_path = storage_path,
                error = %e,
                "Failed to remove document file"
            );
        }
    }
}

fn apply_stored(document: &mut DocumentRecord, stored: &StoredFile) {
    document.content_type = stored.content_type.clone();
    document.storage_path = stored.storage_path.clone();
    document.storage_backend = stored.backend.as_str().to_string();
}

fn apply_details(document: &mut DocumentRecord, details: DocumentUpdate) {
    if let Some(name) = details.name {
        document.name = name;
    }
    if let Some(description) = details.description {
        document.description = description;
    }
}

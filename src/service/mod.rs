//! Project and document services.
//!
//! Services own every authorization decision. They take the caller's user id
//! from the HTTP layer, check roles before touching storage, and translate
//! `DatabaseError` into their own failure kinds so that only its message
//! crosses the boundary.

pub mod documents;
pub mod policy;
pub mod projects;

pub use documents::{DocumentService, DocumentUpdate, Upload};
pub use projects::{ProjectService, ProjectUpdate};

use thiserror::Error;
use uuid::Uuid;

pub const PROJECT_NAME_MAX_LEN: usize = 100;
pub const PROJECT_DESCRIPTION_MAX_LEN: usize = 1000;
pub const DOCUMENT_NAME_MAX_LEN: usize = 100;
pub const DOCUMENT_DESCRIPTION_MAX_LEN: usize = 300;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("{0}")]
    Validation(String),
    #[error("Project {0} not found")]
    NotFound(Uuid),
    #[error("You do not have permission to perform this action on the project")]
    PermissionDenied,
    #[error("Only the project owner can invite participants")]
    NotAuthorized,
    #[error("User '{0}' not found")]
    UserNotFound(String),
    #[error("User '{0}' already has a role on this project")]
    AlreadyAssigned(String),
    #[error("Failed to create project: {0}")]
    Create(String),
    #[error("Failed to retrieve project: {0}")]
    Retrieve(String),
    #[error("Failed to update project: {0}")]
    Update(String),
    #[error("Failed to delete project: {0}")]
    Delete(String),
    #[error("Failed to assign role: {0}")]
    RoleCreate(String),
    #[error("Failed to read roles: {0}")]
    RoleRead(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("{0}")]
    Validation(String),
    #[error("Document {0} not found")]
    NotFound(Uuid),
    #[error("You do not have access to this document")]
    AccessDenied,
    #[error("Only the project owner can delete documents")]
    PermissionDenied,
    #[error("Nothing to update")]
    EmptyUpdate,
    #[error("Another document in this project is already stored as '{0}'")]
    FileNameTaken(String),
    #[error("Failed to save file: {0}")]
    StorageWrite(String),
    #[error("Failed to read file: {0}")]
    StorageRead(String),
    #[error("Stored file for document {0} is missing")]
    FileMissing(Uuid),
    #[error("Unsupported storage backend '{0}'")]
    UnsupportedBackend(String),
    #[error("Failed to create document: {0}")]
    Create(String),
    #[error("Failed to retrieve document: {0}")]
    Retrieve(String),
    #[error("Failed to delete document: {0}")]
    Delete(String),
}

/// Validate a project name, returning it trimmed.
pub fn validate_project_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Project name must not be empty".to_string());
    }
    if name.chars().count() > PROJECT_NAME_MAX_LEN {
        return Err(format!(
            "Project name must be at most {PROJECT_NAME_MAX_LEN} characters"
        ));
    }
    Ok(name.to_string())
}

pub fn validate_project_description(description: &str) -> Result<String, String> {
    let description = description.trim();
    if description.chars().count() > PROJECT_DESCRIPTION_MAX_LEN {
        return Err(format!(
            "Project description must be at most {PROJECT_DESCRIPTION_MAX_LEN} characters"
        ));
    }
    Ok(description.to_string())
}

pub fn validate_document_name(name: &str) -> Result<(), String> {
    if name.chars().count() > DOCUMENT_NAME_MAX_LEN {
        return Err(format!(
            "Document name must be at most {DOCUMENT_NAME_MAX_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_document_description(description: &str) -> Result<(), String> {
    if description.chars().count() > DOCUMENT_DESCRIPTION_MAX_LEN {
        return Err(format!(
            "Document description must be at most {DOCUMENT_DESCRIPTION_MAX_LEN} characters"
        ));
    }
    Ok(())
}

/// Treat empty strings as "not supplied".
pub(crate) fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

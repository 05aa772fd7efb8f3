mod auth;
mod documents;
mod health;
mod projects;

use uuid::Uuid;

use crate::api::response::ApiError;
use crate::auth::AuthError;
use crate::service::{DocumentError, ProjectError};

pub use auth::{login, register};
pub use documents::{
    delete_document, document_details, download_document, list_documents, update_document,
    upload_document,
};
pub use health::health;
pub use projects::{
    create_project, delete_project, get_project, invite_participant, list_projects,
    update_project,
};

/// Parse a path id. Malformed ids cannot name an existing entity.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("No entity with id '{raw}'")))
}

impl From<ProjectError> for ApiError {
    fn from(e: ProjectError) -> Self {
        let message = e.to_string();
        match e {
            ProjectError::Validation(_) => ApiError::bad_request(message),
            ProjectError::NotFound(_) | ProjectError::UserNotFound(_) => {
                ApiError::not_found(message)
            }
            ProjectError::PermissionDenied | ProjectError::NotAuthorized => {
                ApiError::forbidden(message)
            }
            ProjectError::AlreadyAssigned(_) => ApiError::conflict(message),
            ProjectError::Create(_)
            | ProjectError::Retrieve(_)
            | ProjectError::Update(_)
            | ProjectError::Delete(_)
            | ProjectError::RoleCreate(_)
            | ProjectError::RoleRead(_) => {
                tracing::error!(error = %message, "Project operation failed");
                ApiError::internal(message)
            }
        }
    }
}

impl From<DocumentError> for ApiError {
    fn from(e: DocumentError) -> Self {
        let message = e.to_string();
        match e {
            DocumentError::Project(e) => e.into(),
            DocumentError::Validation(_) | DocumentError::UnsupportedBackend(_) => {
                ApiError::bad_request(message)
            }
            DocumentError::NotFound(_) | DocumentError::FileMissing(_) => {
                ApiError::not_found(message)
            }
            DocumentError::AccessDenied | DocumentError::PermissionDenied => {
                ApiError::forbidden(message)
            }
            DocumentError::EmptyUpdate => ApiError::accepted(message),
            DocumentError::FileNameTaken(_) => ApiError::conflict(message),
            DocumentError::StorageWrite(_) => ApiError::unprocessable(message),
            DocumentError::StorageRead(_)
            | DocumentError::Create(_)
            | DocumentError::Retrieve(_)
            | DocumentError::Delete(_) => {
                tracing::error!(error = %message, "Document operation failed");
                ApiError::internal(message)
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let message = e.to_string();
        match e {
            AuthError::Validation(_) => ApiError::bad_request(message),
            AuthError::UsernameTaken(_) | AuthError::EmailTaken(_) => ApiError::conflict(message),
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                ApiError::unauthorized(message)
            }
            AuthError::UserCreate(_)
            | AuthError::UserRetrieve(_)
            | AuthError::Hashing(_)
            | AuthError::Token(_) => {
                tracing::error!(error = %message, "Credential operation failed");
                ApiError::internal(message)
            }
        }
    }
}

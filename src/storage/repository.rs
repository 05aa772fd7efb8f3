//! Persistence seams used by the services.
//!
//! Every method returns `Ok(None)` / `Ok(false)` for missing entities and
//! reserves `Err` for backend failures, which services wrap into their own
//! failure kinds.

use uuid::Uuid;

use super::db::DatabaseError;
use super::models::{DocumentRecord, Participant, Project, ProjectRecord, Role, UserRecord};
use crate::service::policy::role_of;

pub trait UserRepository {
    /// Insert a user. Fails with `Constraint` when the username or email is taken.
    fn create_user(&self, user: &UserRecord) -> Result<(), DatabaseError>;
    fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;
}

pub trait ProjectRepository {
    /// Insert a project and grant its owner the `Owner` role in one transaction.
    fn create_project(&self, project: &ProjectRecord) -> Result<(), DatabaseError>;
    /// Load a project with its documents and participants.
    fn get_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError>;
    /// Projects on which the user holds any role.
    fn list_projects_by_user(&self, user_id: Uuid) -> Result<Vec<ProjectRecord>, DatabaseError>;
    /// Overwrite a project's own fields. Returns false when it does not exist.
    fn save_project(&self, project: &ProjectRecord) -> Result<bool, DatabaseError>;
    /// Delete a project together with its document records and role rows.
    fn delete_project(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

pub trait DocumentRepository {
    fn create_document(&self, document: &DocumentRecord) -> Result<(), DatabaseError>;
    fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, DatabaseError>;
    fn get_document_by_filename(
        &self,
        project_id: Uuid,
        file_name: &str,
    ) -> Result<Option<DocumentRecord>, DatabaseError>;
    fn list_documents_by_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<DocumentRecord>, DatabaseError>;
    /// Persist changes to an existing document, stamping `updated_at`.
    /// Returns the stored record, or `None` when the document does not exist.
    fn save_document(
        &self,
        document: &DocumentRecord,
    ) -> Result<Option<DocumentRecord>, DatabaseError>;
    fn delete_document(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

pub trait RoleRepository {
    /// Add a role row. Fails with `Constraint` when the user already holds a role.
    fn add_role(&self, project_id: Uuid, user_id: Uuid, role: Role) -> Result<(), DatabaseError>;
    fn list_participants(&self, project_id: Uuid) -> Result<Vec<Participant>, DatabaseError>;

    fn get_role(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<Role>, DatabaseError> {
        Ok(role_of(user_id, &self.list_participants(project_id)?))
    }
}

/// Everything the services need from persistence.
pub trait Repository:
    UserRepository + ProjectRepository + DocumentRepository + RoleRepository + Send + Sync
{
}

impl<T> Repository for T where
    T: UserRepository + ProjectRepository + DocumentRepository + RoleRepository + Send + Sync
{
}

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::policy::{can_read, can_write, role_of};
use super::{validate_project_description, validate_project_name, ProjectError};
use crate::object_store::StorageRegistry;
use crate::storage::models::{Project, ProjectRecord, Role, UserRecord};
use crate::storage::{DatabaseError, Repository};

/// Optional changes to a project's own fields.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Project CRUD and the participant table.
#[derive(Clone)]
pub struct ProjectService {
    repo: Arc<dyn Repository>,
    storage: StorageRegistry,
}

impl ProjectService {
    pub fn new(repo: Arc<dyn Repository>, storage: StorageRegistry) -> Self {
        Self { repo, storage }
    }

    /// Create a project owned by `owner_id`. The owner role is granted in the
    /// same write as the project row.
    pub fn create_project(
        &self,
        owner_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project, ProjectError> {
        let name = validate_project_name(name).map_err(ProjectError::Validation)?;
        let description = validate_project_description(description.unwrap_or_default())
            .map_err(ProjectError::Validation)?;

        let record = ProjectRecord {
            id: Uuid::new_v4(),
            name,
            description,
            owner_id,
            created_at: Utc::now(),
        };

        self.repo
            .create_project(&record)
            .map_err(|e| ProjectError::Create(e.to_string()))?;

        tracing::info!(project_id = %record.id, owner_id = %owner_id, "Created project");

        self.repo
            .get_project(record.id)
            .map_err(|e| ProjectError::Retrieve(e.to_string()))?
            .ok_or_else(|| ProjectError::Create("project missing after insert".to_string()))
    }

    /// All projects in which the user holds any role.
    pub fn list_projects(&self, user_id: Uuid) -> Result<Vec<ProjectRecord>, ProjectError> {
        self.repo
            .list_projects_by_user(user_id)
            .map_err(|e| ProjectError::Retrieve(e.to_string()))
    }

    /// Load a project the caller participates in.
    pub fn get_project(&self, project_id: Uuid, user_id: Uuid) -> Result<Project, ProjectError> {
        let project = self.load(project_id)?;
        if !can_read(role_of(user_id, &project.participants)) {
            return Err(ProjectError::PermissionDenied);
        }
        Ok(project)
    }

    /// Load a project the caller owns.
    pub fn get_owned_project(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Project, ProjectError> {
        let project = self.load(project_id)?;
        if !can_write(role_of(user_id, &project.participants)) {
            return Err(ProjectError::PermissionDenied);
        }
        Ok(project)
    }

    pub fn update_project(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        update: ProjectUpdate,
    ) -> Result<Project, ProjectError> {
        let name = update
            .name
            .as_deref()
            .map(validate_project_name)
            .transpose()
            .map_err(ProjectError::Validation)?;
        let description = update
            .description
            .as_deref()
            .map(validate_project_description)
            .transpose()
            .map_err(ProjectError::Validation)?;

        let mut project = self.get_owned_project(project_id, user_id)?;
        if let Some(name) = name {
            project.name = name;
        }
        if let Some(description) = description {
            project.description = description;
        }

        let saved = self
            .repo
            .save_project(&project.to_record())
            .map_err(|e| ProjectError::Update(e.to_string()))?;
        if !saved {
            return Err(ProjectError::NotFound(project_id));
        }

        tracing::debug!(project_id = %project_id, "Updated project");
        Ok(project)
    }

    /// Delete a project, its documents and its role rows, then remove every
    /// document's bytes through the backend recorded on the document.
    ///
    /// The database commit comes first. Storage failures afterwards are
    /// logged and leave orphaned bytes rather than dangling records.
    pub async fn delete_project(&self, project_id: Uuid, user_id: Uuid) -> Result<(), ProjectError> {
        let project = self.get_owned_project(project_id, user_id)?;

        let deleted = self
            .repo
            .delete_project(project_id)
            .map_err(|e| ProjectError::Delete(e.to_string()))?;
        if !deleted {
            return Err(ProjectError::NotFound(project_id));
        }

        for document in &project.documents {
            let Some(store) = self.storage.for_tag(&document.storage_backend) else {
                tracing::warn!(
                    project_id = %project_id,
                    document_id = %document.id,
                    backend = %document.storage_backend,
                    "No storage backend for document, leaving bytes in place"
                );
                continue;
            };
            if let Err(e) = store.remove(&document.storage_path).await {
                tracing::error!(
                    project_id = %project_id,
                    document_id = %document.id,
                    storage_path = %document.storage_path,
                    error = %e,
                    "Failed to remove document file after project delete"
                );
            }
        }

        tracing::info!(
            project_id = %project_id,
            documents = project.documents.len(),
            "Deleted project"
        );
        Ok(())
    }

    /// Grant `username` the participant role. Only the current owner may invite.
    pub fn invite_participant(
        &self,
        project_id: Uuid,
        caller_id: Uuid,
        username: &str,
    ) -> Result<UserRecord, ProjectError> {
        let caller_role = self
            .repo
            .get_role(project_id, caller_id)
            .map_err(|e| ProjectError::RoleRead(e.to_string()))?;
        if !can_write(caller_role) {
            return Err(ProjectError::NotAuthorized);
        }

        let user = self
            .repo
            .get_user_by_username(username)
            .map_err(|e| ProjectError::Retrieve(e.to_string()))?
            .ok_or_else(|| ProjectError::UserNotFound(username.to_string()))?;

        let existing = self
            .repo
            .get_role(project_id, user.id)
            .map_err(|e| ProjectError::RoleRead(e.to_string()))?;
        if existing.is_some() {
            return Err(ProjectError::AlreadyAssigned(username.to_string()));
        }

        self.repo
            .add_role(project_id, user.id, Role::Participant)
            .map_err(|e| match e {
                DatabaseError::Constraint(_) => ProjectError::AlreadyAssigned(username.to_string()),
                e => ProjectError::RoleCreate(e.to_string()),
            })?;

        tracing::info!(project_id = %project_id, user_id = %user.id, "Invited participant");
        Ok(user)
    }

    fn load(&self, project_id: Uuid) -> Result<Project, ProjectError> {
        self.repo
            .get_project(project_id)
            .map_err(|e| ProjectError::Retrieve(e.to_string()))?
            .ok_or(ProjectError::NotFound(project_id))
    }
}

use chrono::Utc;
use redb::ReadableTable;
use uuid::Uuid;

use super::db::{read_list, read_record, write_list, write_record, Database, DatabaseError};
use super::documents::documents_for_project;
use super::models::{Participant, Project, ProjectRecord, Role};
use super::repository::ProjectRepository;
use super::tables::*;

impl ProjectRepository for Database {
    fn create_project(&self, project: &ProjectRecord) -> Result<(), DatabaseError> {
        debug_assert!(!project.name.is_empty(), "project name must not be empty");

        let id = project.id.to_string();
        let owner_key = project.owner_id.to_string();

        let write_txn = self.begin_write()?;
        {
            let mut projects = write_txn.open_table(PROJECTS)?;
            if projects.get(id.as_str())?.is_some() {
                return Err(DatabaseError::Constraint(format!(
                    "project {id} already exists"
                )));
            }
            write_record(&mut projects, &id, project)?;

            // The owner role is granted in the same transaction as the project row
            let mut participants = write_txn.open_table(PROJECT_PARTICIPANTS)?;
            let owner = Participant {
                user_id: project.owner_id,
                role: Role::Owner,
                created_at: Utc::now(),
            };
            write_list(&mut participants, &id, &[owner])?;

            let mut memberships = write_txn.open_table(USER_PROJECTS)?;
            let mut project_ids: Vec<Uuid> = read_list(&memberships, &owner_key)?;
            if !project_ids.contains(&project.id) {
                project_ids.push(project.id);
                write_list(&mut memberships, &owner_key, &project_ids)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let key = id.to_string();
        let read_txn = self.begin_read()?;

        let projects = read_txn.open_table(PROJECTS)?;
        let record: ProjectRecord = match read_record(&projects, &key)? {
            Some(record) => record,
            None => return Ok(None),
        };

        let documents = documents_for_project(&read_txn, &key)?;

        let participants_table = read_txn.open_table(PROJECT_PARTICIPANTS)?;
        let participants: Vec<Participant> = read_list(&participants_table, &key)?;

        Ok(Some(Project::from_parts(record, documents, participants)))
    }

    fn list_projects_by_user(&self, user_id: Uuid) -> Result<Vec<ProjectRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let memberships = read_txn.open_table(USER_PROJECTS)?;
        let projects = read_txn.open_table(PROJECTS)?;

        let project_ids: Vec<Uuid> = read_list(&memberships, user_id.to_string().as_str())?;

        let mut records = Vec::with_capacity(project_ids.len());
        for project_id in project_ids {
            if let Some(record) = read_record(&projects, project_id.to_string().as_str())? {
                records.push(record);
            }
        }
        records.sort_by(|a: &ProjectRecord, b| a.created_at.cmp(&b.created_at));

        Ok(records)
    }

    fn save_project(&self, project: &ProjectRecord) -> Result<bool, DatabaseError> {
        let id = project.id.to_string();
        let write_txn = self.begin_write()?;

        let saved = {
            let mut projects = write_txn.open_table(PROJECTS)?;
            let exists = projects.get(id.as_str())?.is_some();
            if exists {
                write_record(&mut projects, &id, project)?;
            }
            exists
        };

        write_txn.commit()?;
        Ok(saved)
    }

    fn delete_project(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let key = id.to_string();
        let write_txn = self.begin_write()?;

        let deleted = {
            let mut projects = write_txn.open_table(PROJECTS)?;
            if projects.remove(key.as_str())?.is_none() {
                false
            } else {
                // Cascade: document records
                let mut index = write_txn.open_table(PROJECT_DOCUMENTS)?;
                let document_ids: Vec<Uuid> = read_list(&index, &key)?;
                let mut documents = write_txn.open_table(DOCUMENTS)?;
                for document_id in &document_ids {
                    documents.remove(document_id.to_string().as_str())?;
                }
                index.remove(key.as_str())?;

                // Cascade: role rows and the membership index
                let mut participants_table = write_txn.open_table(PROJECT_PARTICIPANTS)?;
                let participants: Vec<Participant> = read_list(&participants_table, &key)?;
                participants_table.remove(key.as_str())?;

                let mut memberships = write_txn.open_table(USER_PROJECTS)?;
                for participant in participants {
                    let user_key = participant.user_id.to_string();
                    let mut project_ids: Vec<Uuid> = read_list(&memberships, &user_key)?;
                    project_ids.retain(|pid| *pid != id);
                    write_list(&mut memberships, &user_key, &project_ids)?;
                }
                true
            }
        };

        write_txn.commit()?;
        Ok(deleted)
    }
}

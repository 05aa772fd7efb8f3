use chrono::Utc;
use redb::ReadableTable;
use uuid::Uuid;

use super::db::{read_list, write_list, Database, DatabaseError};
use super::models::{Participant, Role};
use super::repository::RoleRepository;
use super::tables::*;

impl RoleRepository for Database {
    fn add_role(&self, project_id: Uuid, user_id: Uuid, role: Role) -> Result<(), DatabaseError> {
        let project_key = project_id.to_string();
        let user_key = user_id.to_string();

        let write_txn = self.begin_write()?;
        {
            let projects = write_txn.open_table(PROJECTS)?;
            if projects.get(project_key.as_str())?.is_none() {
                return Err(DatabaseError::Constraint(format!(
                    "project {project_key} does not exist"
                )));
            }

            // (user, project) is unique
            let mut participants_table = write_txn.open_table(PROJECT_PARTICIPANTS)?;
            let mut participants: Vec<Participant> = read_list(&participants_table, &project_key)?;
            if participants.iter().any(|p| p.user_id == user_id) {
                return Err(DatabaseError::Constraint(format!(
                    "user {user_key} already holds a role on project {project_key}"
                )));
            }
            participants.push(Participant {
                user_id,
                role,
                created_at: Utc::now(),
            });
            write_list(&mut participants_table, &project_key, &participants)?;

            let mut memberships = write_txn.open_table(USER_PROJECTS)?;
            let mut project_ids: Vec<Uuid> = read_list(&memberships, &user_key)?;
            if !project_ids.contains(&project_id) {
                project_ids.push(project_id);
                write_list(&mut memberships, &user_key, &project_ids)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_participants(&self, project_id: Uuid) -> Result<Vec<Participant>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let participants = read_txn.open_table(PROJECT_PARTICIPANTS)?;
        read_list(&participants, project_id.to_string().as_str())
    }
}

use redb::ReadableTable;
use uuid::Uuid;

use super::db::{read_record, write_record, Database, DatabaseError};
use super::models::UserRecord;
use super::repository::UserRepository;
use super::tables::*;

impl Database {
    fn get_user_by_index(
        &self,
        index: redb::TableDefinition<'static, &'static str, &'static str>,
        value: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index_table = read_txn.open_table(index)?;

        let id = match index_table.get(value)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        read_record(&users, id.as_str())
    }
}

impl UserRepository for Database {
    fn create_user(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        let id = user.id.to_string();
        let write_txn = self.begin_write()?;
        {
            let mut usernames = write_txn.open_table(USERNAMES)?;
            if usernames.get(user.username.as_str())?.is_some() {
                return Err(DatabaseError::Constraint(format!(
                    "username '{}' already exists",
                    user.username
                )));
            }
            let mut emails = write_txn.open_table(EMAILS)?;
            if emails.get(user.email.as_str())?.is_some() {
                return Err(DatabaseError::Constraint(format!(
                    "email '{}' already exists",
                    user.email
                )));
            }

            usernames.insert(user.username.as_str(), id.as_str())?;
            emails.insert(user.email.as_str(), id.as_str())?;

            let mut users = write_txn.open_table(USERS)?;
            write_record(&mut users, &id, user)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        read_record(&users, id.to_string().as_str())
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>, DatabaseError> {
        self.get_user_by_index(USERNAMES, username)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        self.get_user_by_index(EMAILS, email)
    }
}

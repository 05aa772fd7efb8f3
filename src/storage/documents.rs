use chrono::Utc;
use redb::{ReadTransaction, ReadableTable};
use uuid::Uuid;

use super::db::{read_list, read_record, write_list, write_record, Database, DatabaseError};
use super::models::DocumentRecord;
use super::repository::DocumentRepository;
use super::tables::*;

/// Resolve a project's document index into records, oldest first.
pub(super) fn documents_for_project(
    read_txn: &ReadTransaction,
    project_key: &str,
) -> Result<Vec<DocumentRecord>, DatabaseError> {
    let index = read_txn.open_table(PROJECT_DOCUMENTS)?;
    let documents = read_txn.open_table(DOCUMENTS)?;

    let document_ids: Vec<Uuid> = read_list(&index, project_key)?;

    let mut records = Vec::with_capacity(document_ids.len());
    for document_id in document_ids {
        if let Some(record) = read_record(&documents, document_id.to_string().as_str())? {
            records.push(record);
        }
    }

    Ok(records)
}

impl DocumentRepository for Database {
    fn create_document(&self, document: &DocumentRecord) -> Result<(), DatabaseError> {
        debug_assert!(
            !document.file_name.is_empty(),
            "document file_name must not be empty"
        );

        let id = document.id.to_string();
        let project_key = document.project_id.to_string();

        let write_txn = self.begin_write()?;
        {
            let projects = write_txn.open_table(PROJECTS)?;
            if projects.get(project_key.as_str())?.is_none() {
                return Err(DatabaseError::Constraint(format!(
                    "project {project_key} does not exist"
                )));
            }

            let mut documents = write_txn.open_table(DOCUMENTS)?;
            write_record(&mut documents, &id, document)?;

            // Maintain project index
            let mut index = write_txn.open_table(PROJECT_DOCUMENTS)?;
            let mut document_ids: Vec<Uuid> = read_list(&index, &project_key)?;
            if !document_ids.contains(&document.id) {
                document_ids.push(document.id);
                write_list(&mut index, &project_key, &document_ids)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let documents = read_txn.open_table(DOCUMENTS)?;
        read_record(&documents, id.to_string().as_str())
    }

    fn get_document_by_filename(
        &self,
        project_id: Uuid,
        file_name: &str,
    ) -> Result<Option<DocumentRecord>, DatabaseError> {
        Ok(self
            .list_documents_by_project(project_id)?
            .into_iter()
            .find(|d| d.file_name == file_name))
    }

    fn list_documents_by_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<DocumentRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        documents_for_project(&read_txn, project_id.to_string().as_str())
    }

    fn save_document(
        &self,
        document: &DocumentRecord,
    ) -> Result<Option<DocumentRecord>, DatabaseError> {
        let id = document.id.to_string();
        let write_txn = self.begin_write()?;

        let saved = {
            let mut documents = write_txn.open_table(DOCUMENTS)?;
            let existing: Option<DocumentRecord> = read_record(&documents, &id)?;
            match existing {
                Some(existing) => {
                    let mut updated = document.clone();
                    // Ownership and creation time are fixed at upload
                    updated.project_id = existing.project_id;
                    updated.created_at = existing.created_at;
                    updated.updated_at = Some(Utc::now());
                    write_record(&mut documents, &id, &updated)?;
                    Some(updated)
                }
                None => None,
            }
        };

        write_txn.commit()?;
        Ok(saved)
    }

    fn delete_document(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let key = id.to_string();
        let write_txn = self.begin_write()?;

        let deleted = {
            let mut documents = write_txn.open_table(DOCUMENTS)?;
            let existing: Option<DocumentRecord> = read_record(&documents, &key)?;
            match existing {
                Some(document) => {
                    documents.remove(key.as_str())?;

                    let project_key = document.project_id.to_string();
                    let mut index = write_txn.open_table(PROJECT_DOCUMENTS)?;
                    let mut document_ids: Vec<Uuid> = read_list(&index, &project_key)?;
                    document_ids.retain(|did| *did != id);
                    write_list(&mut index, &project_key, &document_ids)?;
                    true
                }
                None => false,
            }
        };

        write_txn.commit()?;
        Ok(deleted)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a user holds on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Participant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Participant => "participant",
        }
    }
}

/// A user record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A project record stored in redb (without its children)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One row of a project's role table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A document record stored in redb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Normalized filename, unique within the project
    pub file_name: String,
    pub content_type: String,
    /// Path or object key, interpreted according to `storage_backend`
    pub storage_path: String,
    pub storage_backend: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A project together with its documents and participants.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub documents: Vec<DocumentRecord>,
    pub participants: Vec<Participant>,
}

impl Project {
    pub fn from_parts(
        record: ProjectRecord,
        documents: Vec<DocumentRecord>,
        participants: Vec<Participant>,
    ) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            owner_id: record.owner_id,
            created_at: record.created_at,
            documents,
            participants,
        }
    }

    pub fn to_record(&self) -> ProjectRecord {
        ProjectRecord {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            owner_id: self.owner_id,
            created_at: self.created_at,
        }
    }
}

use redb::TableDefinition;

/// User records: uuid -> UserRecord (msgpack)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Username index: username -> uuid
pub const USERNAMES: TableDefinition<&str, &str> = TableDefinition::new("usernames");

/// Email index: email -> uuid
pub const EMAILS: TableDefinition<&str, &str> = TableDefinition::new("emails");

/// Project records: uuid -> ProjectRecord (msgpack)
pub const PROJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("projects");

/// Document records: uuid -> DocumentRecord (msgpack)
pub const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Project document index: project uuid -> msgpack Vec of document UUIDs
pub const PROJECT_DOCUMENTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("project_documents");

/// Role table: project uuid -> msgpack Vec of Participant
pub const PROJECT_PARTICIPANTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("project_participants");

/// Membership index: user uuid -> msgpack Vec of project UUIDs
pub const USER_PROJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_projects");

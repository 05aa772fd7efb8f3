use chrono::Utc;
use project_documents::storage::models::{DocumentRecord, ProjectRecord, Role, UserRecord};
use project_documents::storage::{
    Database, DatabaseError, DocumentRepository, ProjectRepository, RoleRepository,
    UserRepository,
};
use uuid::Uuid;

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_user(username: &str) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "hash".to_string(),
        created_at: Utc::now(),
    }
}

fn sample_project(owner_id: Uuid, name: &str) -> ProjectRecord {
    ProjectRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        owner_id,
        created_at: Utc::now(),
    }
}

fn sample_document(project_id: Uuid, file_name: &str) -> DocumentRecord {
    DocumentRecord {
        id: Uuid::new_v4(),
        project_id,
        file_name: file_name.to_string(),
        content_type: "text/plain".to_string(),
        storage_path: format!("{}/{file_name}", project_id.simple()),
        storage_backend: "local".to_string(),
        name: String::new(),
        description: String::new(),
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// A user with one project they own.
fn seeded() -> (tempfile::TempDir, Database, UserRecord, ProjectRecord) {
    let (dir, db) = test_db();
    let owner = sample_user("owner");
    db.create_user(&owner).unwrap();
    let project = sample_project(owner.id, "Project");
    db.create_project(&project).unwrap();
    (dir, db, owner, project)
}

// ============================================================================
// Users
// ============================================================================

#[test]
fn test_create_and_get_user() {
    let (_dir, db) = test_db();
    let user = sample_user("alice");
    db.create_user(&user).unwrap();

    let by_id = db.get_user(user.id).unwrap().expect("user should exist");
    assert_eq!(by_id.username, "alice");

    let by_name = db.get_user_by_username("alice").unwrap().unwrap();
    assert_eq!(by_name.id, user.id);

    let by_email = db.get_user_by_email("alice@example.com").unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    assert!(db.get_user_by_username("bob").unwrap().is_none());
    assert!(db.get_user(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn test_duplicate_username_and_email_rejected() {
    let (_dir, db) = test_db();
    db.create_user(&sample_user("alice")).unwrap();

    let same_name = sample_user("alice");
    assert!(matches!(
        db.create_user(&same_name),
        Err(DatabaseError::Constraint(_))
    ));

    let mut same_email = sample_user("alice2");
    same_email.email = "alice@example.com".to_string();
    assert!(matches!(
        db.create_user(&same_email),
        Err(DatabaseError::Constraint(_))
    ));

    // The failed inserts left no partial index entries
    assert!(db.get_user_by_username("alice2").unwrap().is_none());
}

// ============================================================================
// Projects and roles
// ============================================================================

#[test]
fn test_create_project_grants_owner_role() {
    let (_dir, db, owner, project) = seeded();

    let loaded = db.get_project(project.id).unwrap().expect("project should exist");
    assert_eq!(loaded.name, "Project");
    assert_eq!(loaded.owner_id, owner.id);
    assert_eq!(loaded.participants.len(), 1);
    assert_eq!(loaded.participants[0].user_id, owner.id);
    assert_eq!(loaded.participants[0].role, Role::Owner);

    assert_eq!(db.get_role(project.id, owner.id).unwrap(), Some(Role::Owner));
    let listed = db.list_projects_by_user(owner.id).unwrap();
    assert_eq!(listed, vec![project]);
}

#[test]
fn test_create_project_twice_rejected() {
    let (_dir, db, _owner, project) = seeded();
    assert!(matches!(
        db.create_project(&project),
        Err(DatabaseError::Constraint(_))
    ));
}

#[test]
fn test_add_role_and_list_by_user() {
    let (_dir, db, _owner, project) = seeded();
    let guest = sample_user("guest");
    db.create_user(&guest).unwrap();

    assert!(db.list_projects_by_user(guest.id).unwrap().is_empty());
    assert_eq!(db.get_role(project.id, guest.id).unwrap(), None);

    db.add_role(project.id, guest.id, Role::Participant).unwrap();

    assert_eq!(
        db.get_role(project.id, guest.id).unwrap(),
        Some(Role::Participant)
    );
    assert_eq!(db.list_participants(project.id).unwrap().len(), 2);
    assert_eq!(db.list_projects_by_user(guest.id).unwrap().len(), 1);

    // Roles are never upgraded or duplicated
    assert!(matches!(
        db.add_role(project.id, guest.id, Role::Owner),
        Err(DatabaseError::Constraint(_))
    ));
    assert_eq!(
        db.get_role(project.id, guest.id).unwrap(),
        Some(Role::Participant)
    );
}

#[test]
fn test_add_role_unknown_project() {
    let (_dir, db) = test_db();
    assert!(matches!(
        db.add_role(Uuid::new_v4(), Uuid::new_v4(), Role::Participant),
        Err(DatabaseError::Constraint(_))
    ));
}

#[test]
fn test_save_project() {
    let (_dir, db, _owner, mut project) = seeded();
    project.name = "Renamed".to_string();
    project.description = "New description".to_string();

    assert!(db.save_project(&project).unwrap());
    let loaded = db.get_project(project.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Renamed");
    assert_eq!(loaded.description, "New description");

    let ghost = sample_project(Uuid::new_v4(), "Ghost");
    assert!(!db.save_project(&ghost).unwrap());
    assert!(db.get_project(ghost.id).unwrap().is_none());
}

#[test]
fn test_list_projects_sorted_by_creation() {
    let (_dir, db) = test_db();
    let owner = sample_user("owner");
    db.create_user(&owner).unwrap();

    let mut later = sample_project(owner.id, "Later");
    let earlier = sample_project(owner.id, "Earlier");
    later.created_at = earlier.created_at + chrono::Duration::seconds(10);

    db.create_project(&later).unwrap();
    db.create_project(&earlier).unwrap();

    let names: Vec<String> = db
        .list_projects_by_user(owner.id)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Earlier", "Later"]);
}

#[test]
fn test_delete_project_cascades() {
    let (_dir, db, owner, project) = seeded();
    let guest = sample_user("guest");
    db.create_user(&guest).unwrap();
    db.add_role(project.id, guest.id, Role::Participant).unwrap();

    let doc_a = sample_document(project.id, "a.txt");
    let doc_b = sample_document(project.id, "b.txt");
    db.create_document(&doc_a).unwrap();
    db.create_document(&doc_b).unwrap();

    // An unrelated project survives
    let other = sample_project(owner.id, "Other");
    db.create_project(&other).unwrap();
    let doc_other = sample_document(other.id, "c.txt");
    db.create_document(&doc_other).unwrap();

    assert!(db.delete_project(project.id).unwrap());

    assert!(db.get_project(project.id).unwrap().is_none());
    assert!(db.get_document(doc_a.id).unwrap().is_none());
    assert!(db.get_document(doc_b.id).unwrap().is_none());
    assert!(db.list_documents_by_project(project.id).unwrap().is_empty());
    assert!(db.list_participants(project.id).unwrap().is_empty());
    assert!(db.list_projects_by_user(guest.id).unwrap().is_empty());

    let remaining = db.list_projects_by_user(owner.id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, other.id);
    assert!(db.get_document(doc_other.id).unwrap().is_some());

    assert!(!db.delete_project(project.id).unwrap());
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_create_and_get_document() {
    let (_dir, db, _owner, project) = seeded();
    let document = sample_document(project.id, "notes.txt");
    db.create_document(&document).unwrap();

    assert_eq!(db.get_document(document.id).unwrap(), Some(document.clone()));
    assert_eq!(
        db.get_document_by_filename(project.id, "notes.txt").unwrap(),
        Some(document.clone())
    );
    assert!(db
        .get_document_by_filename(project.id, "other.txt")
        .unwrap()
        .is_none());
    assert!(db
        .get_document_by_filename(Uuid::new_v4(), "notes.txt")
        .unwrap()
        .is_none());

    let project = db.get_project(project.id).unwrap().unwrap();
    assert_eq!(project.documents, vec![document]);
}

#[test]
fn test_create_document_requires_project() {
    let (_dir, db) = test_db();
    let document = sample_document(Uuid::new_v4(), "orphan.txt");
    assert!(matches!(
        db.create_document(&document),
        Err(DatabaseError::Constraint(_))
    ));
    assert!(db.get_document(document.id).unwrap().is_none());
}

#[test]
fn test_list_documents_in_insertion_order() {
    let (_dir, db, _owner, project) = seeded();
    for name in ["one.txt", "two.txt", "three.txt"] {
        db.create_document(&sample_document(project.id, name)).unwrap();
    }

    let names: Vec<String> = db
        .list_documents_by_project(project.id)
        .unwrap()
        .into_iter()
        .map(|d| d.file_name)
        .collect();
    assert_eq!(names, vec!["one.txt", "two.txt", "three.txt"]);
}

#[test]
fn test_save_document_stamps_updated_at() {
    let (_dir, db, _owner, project) = seeded();
    let document = sample_document(project.id, "notes.txt");
    db.create_document(&document).unwrap();

    let mut changed = document.clone();
    changed.name = "Notes".to_string();
    changed.storage_backend = "s3".to_string();
    // Project and creation time cannot be moved by a save
    changed.project_id = Uuid::new_v4();

    let saved = db.save_document(&changed).unwrap().expect("document exists");
    assert_eq!(saved.name, "Notes");
    assert_eq!(saved.storage_backend, "s3");
    assert_eq!(saved.project_id, project.id);
    assert_eq!(saved.created_at, document.created_at);
    assert!(saved.updated_at.is_some());

    assert_eq!(db.get_document(document.id).unwrap(), Some(saved));

    let ghost = sample_document(project.id, "ghost.txt");
    assert!(db.save_document(&ghost).unwrap().is_none());
}

#[test]
fn test_delete_document() {
    let (_dir, db, _owner, project) = seeded();
    let keep = sample_document(project.id, "keep.txt");
    let drop = sample_document(project.id, "drop.txt");
    db.create_document(&keep).unwrap();
    db.create_document(&drop).unwrap();

    assert!(db.delete_document(drop.id).unwrap());
    assert!(!db.delete_document(drop.id).unwrap());

    assert!(db.get_document(drop.id).unwrap().is_none());
    assert_eq!(db.list_documents_by_project(project.id).unwrap(), vec![keep]);
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let owner = sample_user("owner");
    let project = sample_project(owner.id, "Durable");

    {
        let db = Database::open(&data_dir).unwrap();
        db.create_user(&owner).unwrap();
        db.create_project(&project).unwrap();
        db.create_document(&sample_document(project.id, "a.txt")).unwrap();
    }

    let db = Database::open(&data_dir).unwrap();
    let loaded = db.get_project(project.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Durable");
    assert_eq!(loaded.documents.len(), 1);
    assert_eq!(db.get_role(project.id, owner.id).unwrap(), Some(Role::Owner));
}

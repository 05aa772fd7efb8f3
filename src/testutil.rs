//! Shared test helpers: a tempdir-backed redb database, an in-memory object
//! store that records removals, and ready-wired services.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::config::{AuthConfig, Config, ServerConfig, StorageBackend, StorageConfig, UploadConfig};
use crate::object_store::{
    normalize_filename, project_prefix, Download, DownloadBody, LocalStore, ObjectStore,
    ObjectStoreError, StorageRegistry, StoredFile,
};
use crate::service::{DocumentService, ProjectService};
use crate::storage::models::UserRecord;
use crate::storage::{Database, Repository, UserRepository};
use crate::AppState;

/// Object store keeping bytes in memory, keyed `<project hex>/<file name>`.
pub struct MemoryStore {
    backend: StorageBackend,
    objects: Mutex<HashMap<String, (String, Bytes)>>,
    removed: Mutex<Vec<String>>,
    fail_saves: AtomicBool,
    fail_removes: AtomicBool,
}

impl MemoryStore {
    pub fn new(backend: StorageBackend) -> Self {
        Self {
            backend,
            objects: Mutex::new(HashMap::new()),
            removed: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        }
    }

    /// Every path passed to `remove`, in call order, including refused ones.
    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub fn contains(&self, storage_path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(storage_path)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }

    /// Make every following `save` fail.
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Make every following `remove` fail, leaving the bytes in place.
    pub fn fail_removes(&self) {
        self.fail_removes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn backend(&self) -> StorageBackend {
        self.backend
    }

    async fn save(
        &self,
        project_id: Uuid,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredFile, ObjectStoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("save refused".to_string()));
        }

        let file_name = normalize_filename(file_name);
        let storage_path = format!("{}/{}", project_prefix(project_id), file_name);
        self.objects
            .lock()
            .unwrap()
            .insert(storage_path.clone(), (content_type.to_string(), data));

        Ok(StoredFile {
            file_name,
            content_type: content_type.to_string(),
            storage_path,
            backend: self.backend,
        })
    }

    async fn remove(&self, storage_path: &str) -> Result<(), ObjectStoreError> {
        self.removed.lock().unwrap().push(storage_path.to_string());
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("remove refused".to_string()));
        }
        self.objects.lock().unwrap().remove(storage_path);
        Ok(())
    }

    async fn download(&self, storage_path: &str) -> Result<Download, ObjectStoreError> {
        let (content_type, data) = self
            .objects
            .lock()
            .unwrap()
            .get(storage_path)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(storage_path.to_string()))?;

        Ok(Download {
            content_length: Some(data.len() as u64),
            last_modified: Some(Utc::now()),
            content_type: Some(content_type),
            body: DownloadBody::Stream(Box::pin(Cursor::new(data.to_vec()))),
        })
    }
}

pub fn test_db(temp_dir: &tempfile::TempDir) -> Database {
    Database::open(temp_dir.path().join("data")).expect("Failed to open test database")
}

/// Insert a user directly; the password hash is not a real hash.
pub fn create_user(db: &Database, username: &str) -> UserRecord {
    let user = UserRecord {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "unused".to_string(),
        created_at: Utc::now(),
    };
    db.create_user(&user).expect("Failed to create test user");
    user
}

/// Services wired to a real redb database and two in-memory backends.
pub struct TestContext {
    pub db: Database,
    pub local: Arc<MemoryStore>,
    pub s3: Arc<MemoryStore>,
    pub registry: StorageRegistry,
    pub projects: ProjectService,
    pub documents: DocumentService,
}

pub fn test_context(temp_dir: &tempfile::TempDir, default: StorageBackend) -> TestContext {
    let db = test_db(temp_dir);
    let local = Arc::new(MemoryStore::new(StorageBackend::Local));
    let s3 = Arc::new(MemoryStore::new(StorageBackend::S3));

    let local_store: Arc<dyn ObjectStore> = local.clone();
    let s3_store: Arc<dyn ObjectStore> = s3.clone();
    let registry = StorageRegistry::new(default, local_store, Some(s3_store))
        .expect("Failed to build storage registry");

    let repo: Arc<dyn Repository> = Arc::new(db.clone());
    let projects = ProjectService::new(Arc::clone(&repo), registry.clone());
    let documents = DocumentService::new(repo, registry.clone(), projects.clone());

    TestContext {
        db,
        local,
        s3,
        registry,
        projects,
        documents,
    }
}

pub fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    Config {
        auth: AuthConfig {
            token_secret: "test-secret".to_string(),
            token_expire_minutes: 30,
        },
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: temp_dir.path().join("data").to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            local_storage_path: temp_dir.path().join("files").to_string_lossy().to_string(),
            s3: None,
        },
        upload: UploadConfig {
            max_upload_size: 1024,
            ..UploadConfig::default()
        },
    }
}

/// Full application state on a temporary directory with the local backend.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let config = test_config(temp_dir);
    let db = test_db(temp_dir);
    let local = LocalStore::new(&config.storage.local_storage_path)
        .expect("Failed to create test object store");
    let registry = StorageRegistry::new(StorageBackend::Local, Arc::new(local), None)
        .expect("Failed to build storage registry");

    Arc::new(AppState::new(config, db, registry))
}

//! project-documents - multi-tenant project and document management backend
//!
//! This crate provides project workspaces with owner/participant roles and
//! document storage behind them:
//! - Swappable object storage backends (local filesystem, S3), chosen per document
//! - redb embedded database for users, projects, roles and document metadata
//! - Bearer-token authentication with Argon2id password hashes
//! - REST API with multipart upload and streaming download

pub mod api;
pub mod auth;
pub mod config;
pub mod object_store;
pub mod service;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use auth::AuthService;
use config::Config;
use object_store::StorageRegistry;
use service::{DocumentService, ProjectService};
use storage::{Database, Repository};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub storage: StorageRegistry,
    pub auth: AuthService,
    pub projects: ProjectService,
    pub documents: DocumentService,
}

impl AppState {
    pub fn new(config: Config, db: Database, storage: StorageRegistry) -> Self {
        let repo: Arc<dyn Repository> = Arc::new(db.clone());
        let auth = AuthService::new(Arc::clone(&repo), &config.auth);
        let projects = ProjectService::new(Arc::clone(&repo), storage.clone());
        let documents = DocumentService::new(repo, storage.clone(), projects.clone());

        Self {
            config,
            db,
            storage,
            auth,
            projects,
            documents,
        }
    }
}

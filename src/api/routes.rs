use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Room for the text fields and multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.upload.max_upload_size as usize + MULTIPART_OVERHEAD;

    Router::new()
        // Auth
        .route("/auth", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/:id",
            get(handlers::get_project)
                .patch(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/projects/:id/invite", post(handlers::invite_participant))
        // Documents
        .route(
            "/projects/:id/documents",
            get(handlers::list_documents)
                .post(handlers::upload_document)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/projects/:id/documents/:document_id",
            get(handlers::download_document)
                .patch(handlers::update_document)
                .delete(handlers::delete_document)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/projects/:id/documents/:document_id/details",
            get(handlers::document_details),
        )
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

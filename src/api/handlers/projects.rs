use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::documents::{document_to_response, DocumentResponse};
use super::parse_id;
use crate::api::extract::CurrentUser;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::service::ProjectUpdate;
use crate::storage::models::{Project, ProjectRecord, Role};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub created_at: String,
    pub description: String,
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub role: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub created_at: String,
    pub description: String,
    pub documents: Vec<DocumentResponse>,
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub participants: Vec<ParticipantResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteParams {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub project_id: String,
    pub role: String,
    pub user_id: String,
    pub username: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<JSend<Vec<ProjectSummary>>>, ApiError> {
    let projects = state.projects.list_projects(user.id)?;
    Ok(JSend::success(projects.iter().map(project_to_summary).collect()))
}

pub async fn create_project(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<JSend<ProjectResponse>>), ApiError> {
    let project =
        state
            .projects
            .create_project(user.id, &req.name, req.description.as_deref())?;

    Ok((StatusCode::CREATED, JSend::success(project_to_response(&project))))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<ProjectResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let project = state.projects.get_project(id, user.id)?;
    Ok(JSend::success(project_to_response(&project)))
}

pub async fn update_project(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateProjectRequest>,
) -> Result<Json<JSend<ProjectResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let project = state.projects.update_project(
        id,
        user.id,
        ProjectUpdate {
            name: req.name,
            description: req.description,
        },
    )?;

    Ok(JSend::success(project_to_response(&project)))
}

pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let id = parse_id(&id)?;
    state.projects.delete_project(id, user.id).await?;
    Ok(JSend::success(()))
}

pub async fn invite_participant(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    AppQuery(params): AppQuery<InviteParams>,
) -> Result<(StatusCode, Json<JSend<InviteResponse>>), ApiError> {
    let id = parse_id(&id)?;
    let invited = state
        .projects
        .invite_participant(id, user.id, params.username.trim())?;

    Ok((
        StatusCode::CREATED,
        JSend::success(InviteResponse {
            project_id: id.to_string(),
            role: Role::Participant.as_str().to_string(),
            user_id: invited.id.to_string(),
            username: invited.username,
        }),
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn project_to_summary(project: &ProjectRecord) -> ProjectSummary {
    ProjectSummary {
        created_at: project.created_at.to_rfc3339(),
        description: project.description.clone(),
        id: project.id.to_string(),
        name: project.name.clone(),
        owner_id: project.owner_id.to_string(),
    }
}

fn project_to_response(project: &Project) -> ProjectResponse {
    ProjectResponse {
        created_at: project.created_at.to_rfc3339(),
        description: project.description.clone(),
        documents: project.documents.iter().map(document_to_response).collect(),
        id: project.id.to_string(),
        name: project.name.clone(),
        owner_id: project.owner_id.to_string(),
        participants: project
            .participants
            .iter()
            .map(|p| ParticipantResponse {
                role: p.role.as_str().to_string(),
                user_id: p.user_id.to_string(),
            })
            .collect(),
    }
}

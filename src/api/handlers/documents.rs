use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::parse_id;
use crate::api::extract::CurrentUser;
use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::object_store::DownloadBody;
use crate::service::{DocumentUpdate, Upload};
use crate::storage::models::DocumentRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub content_type: String,
    pub created_at: String,
    pub description: String,
    pub file_name: String,
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub storage_backend: String,
    pub storage_path: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

/// Multipart fields shared by upload and update.
struct DocumentForm {
    file: Option<Upload>,
    details: DocumentUpdate,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(project_id): Path<String>,
    AppQuery(params): AppQuery<ListDocumentsParams>,
) -> Result<Json<JSendPaginated<DocumentResponse>>, ApiError> {
    let project_id = parse_id(&project_id)?;
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let documents = state.documents.list_documents(project_id, user.id)?;
    let total = documents.len() as u64;
    let items: Vec<DocumentResponse> = documents
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(document_to_response)
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(project_id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JSend<DocumentResponse>>), ApiError> {
    let project_id = parse_id(&project_id)?;
    let form = read_document_form(&state, multipart).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("file field is required"))?;

    let document = state
        .documents
        .upload_document(project_id, user.id, file, form.details)
        .await?;

    Ok((StatusCode::CREATED, JSend::success(document_to_response(&document))))
}

pub async fn document_details(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((project_id, document_id)): Path<(String, String)>,
) -> Result<Json<JSend<DocumentResponse>>, ApiError> {
    let document = document_in_project(&state, &user, &project_id, &document_id)?;
    Ok(JSend::success(document_to_response(&document)))
}

pub async fn download_document(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((project_id, document_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let document = document_in_project(&state, &user, &project_id, &document_id)?;
    let (document, download) = state
        .documents
        .download_document(document.id, user.id)
        .await?;

    let body = match download.body {
        DownloadBody::File(file) => Body::from_stream(ReaderStream::new(file)),
        DownloadBody::Stream(reader) => Body::from_stream(ReaderStream::new(reader)),
    };

    let mut response = Response::new(body);
    let headers = response.headers_mut();

    let content_type = if document.content_type.is_empty() {
        download
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string())
    } else {
        document.content_type.clone()
    };
    headers.insert(
        header::CONTENT_TYPE,
        content_type
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    if let Some(length) = download.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    if let Some(modified) = download.last_modified {
        let value = modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(value) = value.parse() {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    if let Ok(value) = content_disposition(&document.file_name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    tracing::debug!(document_id = %document.id, backend = %document.storage_backend, "Serving document");
    Ok(response)
}

pub async fn update_document(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((project_id, document_id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<Json<JSend<DocumentResponse>>, ApiError> {
    let document = document_in_project(&state, &user, &project_id, &document_id)?;
    let form = read_document_form(&state, multipart).await?;

    let document = state
        .documents
        .update_document(document.id, user.id, form.details, form.file)
        .await?;

    Ok(JSend::success(document_to_response(&document)))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path((project_id, document_id)): Path<(String, String)>,
) -> Result<Json<JSend<()>>, ApiError> {
    let document = document_in_project(&state, &user, &project_id, &document_id)?;
    state
        .documents
        .delete_document(document.id, user.id)
        .await?;

    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Load a readable document and check that it belongs to the project in the path.
fn document_in_project(
    state: &AppState,
    user: &CurrentUser,
    project_id: &str,
    document_id: &str,
) -> Result<DocumentRecord, ApiError> {
    let project_id = parse_id(project_id)?;
    let document_id = parse_id(document_id)?;

    let document = state.documents.get_document(document_id, user.id)?;
    if document.project_id != project_id {
        return Err(ApiError::not_found("Document not found in this project"));
    }
    Ok(document)
}

/// Characters left bare in the RFC 5987 `filename*` value.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'.').remove(b'-').remove(b'_');

/// `attachment` disposition with a quoted ASCII fallback name and the exact
/// name in `filename*`. Quotes, backslashes and non-ASCII never reach the
/// quoted form.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(file_name, FILENAME_ENCODE_SET);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(e.body_text())
    } else {
        ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
    }
}

async fn read_text(field: Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid {name}: {}", e.body_text())))
}

/// Parse `file`, `name` and `description`, enforcing the upload policy on the file.
async fn read_document_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<DocumentForm, ApiError> {
    let max_upload_size = state.config.upload.max_upload_size;
    let mut file: Option<Upload> = None;
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let header_type = field.content_type().map(|s| s.to_string());

                let data: Bytes = field.bytes().await.map_err(multipart_error)?;
                if data.len() as u64 > max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {max_upload_size} bytes"
                    )));
                }

                // Multipart Content-Type, or guess from filename, or fallback
                let content_type = header_type
                    .filter(|ct| ct != "application/octet-stream")
                    .or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first()
                            .map(|m| m.to_string())
                    })
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                if !state.config.is_allowed_content_type(&content_type) {
                    return Err(ApiError::bad_request(format!(
                        "File type '{content_type}' is not allowed"
                    )));
                }

                file = Some(Upload {
                    file_name,
                    content_type,
                    data,
                });
            }
            "name" => name = Some(read_text(field, "name").await?),
            "description" => description = Some(read_text(field, "description").await?),
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(DocumentForm {
        file,
        details: DocumentUpdate { name, description },
    })
}

pub(super) fn document_to_response(document: &DocumentRecord) -> DocumentResponse {
    DocumentResponse {
        content_type: document.content_type.clone(),
        created_at: document.created_at.to_rfc3339(),
        description: document.description.clone(),
        file_name: document.file_name.clone(),
        id: document.id.to_string(),
        name: document.name.clone(),
        project_id: document.project_id.to_string(),
        storage_backend: document.storage_backend.clone(),
        storage_path: document.storage_path.clone(),
        updated_at: document.updated_at.map(|t| t.to_rfc3339()),
    }
}

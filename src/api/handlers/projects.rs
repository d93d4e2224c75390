use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::{
    api::{
        middleware::identity::CurrentUser,
        response::{ok, ApiResponse, ListResponse},
        state::AppState,
    },
    domain::{CreateProjectRequest, Project},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<ListResponse<Project>>>> {
    let projects = state
        .service_context
        .project_service
        .list(params.limit, params.offset)
        .await?;

    Ok(ok(projects.into()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Project>>> {
    let project = state.service_context.project_service.get(id).await?;
    Ok(ok(project))
}

pub async fn mine(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ListResponse<Project>>>> {
    let projects = state
        .service_context
        .project_service
        .list_by_creator(user.user_id)
        .await?;

    Ok(ok(projects.into()))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Project>>)> {
    let project = state
        .service_context
        .project_service
        .create(user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, ok(project)))
}

/// Multipart upload; the file is read from the `file` field.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Project>>> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|name| name.to_string())
            .ok_or_else(|| AppError::Validation("Missing file name".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, data.to_vec()));
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::Validation("Missing file field".to_string()))?;

    let project = state
        .service_context
        .project_service
        .upload_file(id, user.user_id, &file_name, &data)
        .await?;

    Ok(ok(project))
}

/// Streams a purchased project's file after re-checking access.
pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(project_id): Path<Uuid>,
) -> Result<Response> {
    let download = state
        .service_context
        .project_service
        .download(project_id, user.user_id)
        .await?;

    let file_name = download.file_name.replace('"', "");
    let body = Body::from_stream(ReaderStream::new(download.object.reader));

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, download.object.size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response())
}

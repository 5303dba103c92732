use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use folio_common::{
    auth::AdminSession,
    db::models::*,
    errors::{AppError, Result},
    knowledge::SourceDocument,
};
use uuid::Uuid;
use validator::Validate;

use super::{drop_index, sync_index, StatusQuery, WriteResponse};
use crate::AppState;

pub async fn list(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Project>>> {
    let rows = state.repo.list_projects(session.owner_id, query.status).await?;
    Ok(Json(rows))
}

pub async fn show(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>> {
    state
        .repo
        .find_project(session.owner_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("project", id))
}

pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Json(input): Json<ProjectInput>,
) -> Result<(StatusCode, Json<WriteResponse<Project>>)> {
    input.validate()?;

    let project = state.repo.create_project(session.owner_id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        project.content_status(),
        SourceDocument::from(&project),
    )
    .await;

    Ok((StatusCode::CREATED, Json(WriteResponse { data: project, index })))
}

pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
    Json(input): Json<ProjectInput>,
) -> Result<Json<WriteResponse<Project>>> {
    input.validate()?;

    let project = state.repo.update_project(session.owner_id, id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        project.content_status(),
        SourceDocument::from(&project),
    )
    .await;

    Ok(Json(WriteResponse { data: project, index }))
}

pub async fn remove(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.repo.delete_project(session.owner_id, id).await? {
        return Err(AppError::not_found("project", id));
    }

    drop_index(&state, session.owner_id, SourceKind::Project, id).await;
    Ok(StatusCode::NO_CONTENT)
}

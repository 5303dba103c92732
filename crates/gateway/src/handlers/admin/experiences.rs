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
) -> Result<Json<Vec<Experience>>> {
    let rows = state.repo.list_experiences(session.owner_id, query.status).await?;
    Ok(Json(rows))
}

pub async fn show(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Experience>> {
    state
        .repo
        .find_experience(session.owner_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("experience", id))
}

/// Rejects an end date before the start date with 400
pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Json(input): Json<ExperienceInput>,
) -> Result<(StatusCode, Json<WriteResponse<Experience>>)> {
    input.validate()?;

    let experience = state.repo.create_experience(session.owner_id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        experience.content_status(),
        SourceDocument::from(&experience),
    )
    .await;

    Ok((StatusCode::CREATED, Json(WriteResponse { data: experience, index })))
}

pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
    Json(input): Json<ExperienceInput>,
) -> Result<Json<WriteResponse<Experience>>> {
    input.validate()?;

    let experience = state.repo.update_experience(session.owner_id, id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        experience.content_status(),
        SourceDocument::from(&experience),
    )
    .await;

    Ok(Json(WriteResponse { data: experience, index }))
}

pub async fn remove(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.repo.delete_experience(session.owner_id, id).await? {
        return Err(AppError::not_found("experience", id));
    }

    drop_index(&state, session.owner_id, SourceKind::Experience, id).await;
    Ok(StatusCode::NO_CONTENT)
}

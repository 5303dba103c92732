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
) -> Result<Json<Vec<Story>>> {
    let rows = state.repo.list_stories(session.owner_id, query.status).await?;
    Ok(Json(rows))
}

pub async fn show(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Story>> {
    state
        .repo
        .find_story(session.owner_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("story", id))
}

pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Json(input): Json<StoryInput>,
) -> Result<(StatusCode, Json<WriteResponse<Story>>)> {
    input.validate()?;

    let story = state.repo.create_story(session.owner_id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        story.content_status(),
        SourceDocument::from(&story),
    )
    .await;

    Ok((StatusCode::CREATED, Json(WriteResponse { data: story, index })))
}

pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
    Json(input): Json<StoryInput>,
) -> Result<Json<WriteResponse<Story>>> {
    input.validate()?;

    let story = state.repo.update_story(session.owner_id, id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        story.content_status(),
        SourceDocument::from(&story),
    )
    .await;

    Ok(Json(WriteResponse { data: story, index }))
}

pub async fn remove(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.repo.delete_story(session.owner_id, id).await? {
        return Err(AppError::not_found("story", id));
    }

    drop_index(&state, session.owner_id, SourceKind::Story, id).await;
    Ok(StatusCode::NO_CONTENT)
}

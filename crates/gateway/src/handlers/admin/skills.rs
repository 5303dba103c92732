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
) -> Result<Json<Vec<Skill>>> {
    let rows = state.repo.list_skills(session.owner_id, query.status).await?;
    Ok(Json(rows))
}

pub async fn show(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Skill>> {
    state
        .repo
        .find_skill(session.owner_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("skill", id))
}

pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Json(input): Json<SkillInput>,
) -> Result<(StatusCode, Json<WriteResponse<Skill>>)> {
    input.validate()?;

    let skill = state.repo.create_skill(session.owner_id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        skill.content_status(),
        SourceDocument::from(&skill),
    )
    .await;

    Ok((StatusCode::CREATED, Json(WriteResponse { data: skill, index })))
}

pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
    Json(input): Json<SkillInput>,
) -> Result<Json<WriteResponse<Skill>>> {
    input.validate()?;

    let skill = state.repo.update_skill(session.owner_id, id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        skill.content_status(),
        SourceDocument::from(&skill),
    )
    .await;

    Ok(Json(WriteResponse { data: skill, index }))
}

pub async fn remove(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.repo.delete_skill(session.owner_id, id).await? {
        return Err(AppError::not_found("skill", id));
    }

    drop_index(&state, session.owner_id, SourceKind::Skill, id).await;
    Ok(StatusCode::NO_CONTENT)
}

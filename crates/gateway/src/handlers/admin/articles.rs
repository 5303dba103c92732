use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use folio_common::{
    auth::AdminSession,
    db::{models::*, Page},
    errors::{AppError, Result},
    knowledge::SourceDocument,
};
use uuid::Uuid;
use validator::Validate;

use super::{drop_index, sync_index, StatusQuery, WriteResponse};
use crate::AppState;

/// Paginated, newest publication first
pub async fn list(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Page<Article>>> {
    let page = state
        .repo
        .list_articles(session.owner_id, query.status, query.page, query.per_page)
        .await?;
    Ok(Json(page))
}

pub async fn show(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Article>> {
    state
        .repo
        .find_article(session.owner_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("article", id))
}

pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Json(input): Json<ArticleInput>,
) -> Result<(StatusCode, Json<WriteResponse<Article>>)> {
    input.validate()?;

    let article = state.repo.create_article(session.owner_id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        article.content_status(),
        SourceDocument::from(&article),
    )
    .await;

    Ok((StatusCode::CREATED, Json(WriteResponse { data: article, index })))
}

/// Keeps the existing slug unless the payload names a new one
pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<WriteResponse<Article>>> {
    input.validate()?;

    let article = state.repo.update_article(session.owner_id, id, input).await?;
    let index = sync_index(
        &state,
        session.owner_id,
        article.content_status(),
        SourceDocument::from(&article),
    )
    .await;

    Ok(Json(WriteResponse { data: article, index }))
}

pub async fn remove(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !state.repo.delete_article(session.owner_id, id).await? {
        return Err(AppError::not_found("article", id));
    }

    drop_index(&state, session.owner_id, SourceKind::Article, id).await;
    Ok(StatusCode::NO_CONTENT)
}

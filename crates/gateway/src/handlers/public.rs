//! Public read-only API
//!
//! Only published rows are visible here.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use folio_common::{
    db::{models::*, Page},
    errors::{AppError, Result},
};

use super::PageQuery;
use crate::AppState;

const PUBLISHED: Option<ContentStatus> = Some(ContentStatus::Published);

pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>> {
    let projects = state.repo.list_projects(state.owner_id(), PUBLISHED).await?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Project>> {
    state
        .repo
        .find_published_project(state.owner_id(), &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("project", slug))
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Article>>> {
    let page = state
        .repo
        .list_articles(state.owner_id(), PUBLISHED, query.page, query.per_page)
        .await?;
    Ok(Json(page))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Article>> {
    state
        .repo
        .find_published_article(state.owner_id(), &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("article", slug))
}

pub async fn list_skills(State(state): State<AppState>) -> Result<Json<Vec<Skill>>> {
    let skills = state.repo.list_skills(state.owner_id(), PUBLISHED).await?;
    Ok(Json(skills))
}

pub async fn list_experiences(State(state): State<AppState>) -> Result<Json<Vec<Experience>>> {
    let experiences = state.repo.list_experiences(state.owner_id(), PUBLISHED).await?;
    Ok(Json(experiences))
}

pub async fn list_stories(State(state): State<AppState>) -> Result<Json<Vec<Story>>> {
    let stories = state.repo.list_stories(state.owner_id(), PUBLISHED).await?;
    Ok(Json(stories))
}

pub async fn get_story(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Story>> {
    state
        .repo
        .find_published_story(state.owner_id(), &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("story", slug))
}

//! Knowledge chunk administration
//!
//! Manual entries are chunked and embedded like any other source. Single
//! chunks can be edited afterwards; a content change re-embeds that chunk.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use folio_common::{
    auth::AdminSession,
    db::{models::*, Page},
    errors::{AppError, Result},
    knowledge::{content_hash, IndexReport, SourceDocument},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::WriteResponse;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeQuery {
    pub source_type: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// A manual entry as returned after creation
#[derive(Debug, Serialize)]
pub struct ManualEntry {
    pub entry_id: Uuid,
    pub title: String,
}

fn parse_kind(source_type: Option<&str>) -> Result<Option<SourceKind>> {
    match source_type.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => SourceKind::parse(raw).map(Some).ok_or_else(|| AppError::Validation {
            message: format!("Unknown source type: {}", raw),
            field: Some("source_type".to_string()),
        }),
    }
}

pub async fn list(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<KnowledgeQuery>,
) -> Result<Json<Page<Chunk>>> {
    let kind = parse_kind(query.source_type.as_deref())?;
    let page = state
        .repo
        .list_chunks(session.owner_id, kind, query.page, query.per_page)
        .await?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Json(input): Json<KnowledgeInput>,
) -> Result<(StatusCode, Json<WriteResponse<ManualEntry>>)> {
    input.validate()?;

    let entry_id = Uuid::new_v4();
    let document = SourceDocument::manual(entry_id, input.title.clone(), input.content, input.metadata);
    let report = state.indexer.index_document(session.owner_id, &document).await?;

    if report.chunks == 0 {
        return Err(AppError::Validation {
            message: "Content is too short to index".to_string(),
            field: Some("content".to_string()),
        });
    }
    if report.all_failed() {
        return Err(AppError::EmbeddingError {
            message: format!("None of the {} chunks could be indexed", report.chunks),
        });
    }

    info!(entry_id = %entry_id, inserted = report.inserted, "Manual knowledge entry indexed");

    let data = ManualEntry { entry_id, title: input.title };
    Ok((StatusCode::CREATED, Json(WriteResponse { data, index: Some(report) })))
}

pub async fn show(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Chunk>> {
    state
        .repo
        .find_chunk(session.owner_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("chunk", id))
}

pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
    Json(input): Json<ChunkUpdate>,
) -> Result<Json<Chunk>> {
    input.validate()?;
    let owner_id = session.owner_id;

    let existing = state
        .repo
        .find_chunk(owner_id, id)
        .await?
        .ok_or_else(|| AppError::not_found("chunk", id))?;

    if let Some(content) = input.content.as_deref().filter(|c| *c != existing.content) {
        let embedder = state.indexer.embedder();
        let embedding = embedder.embed(content).await?;
        state
            .repo
            .replace_chunk_content(
                owner_id,
                id,
                content,
                &content_hash(content),
                embedder.model_name(),
                embedding,
            )
            .await?;
        info!(chunk_id = %id, "Chunk content re-embedded");
    }

    let chunk = state
        .repo
        .update_chunk_meta(owner_id, id, input.title, input.metadata)
        .await?;
    Ok(Json(chunk))
}

pub async fn remove(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.repo.delete_chunk(session.owner_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("chunk", id))
    }
}

/// Rebuild every content chunk of the owner
pub async fn reindex(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<IndexReport>> {
    let report = state.indexer.reindex_all(session.owner_id).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind(None).unwrap(), None);
        assert_eq!(parse_kind(Some("  ")).unwrap(), None);
        assert_eq!(parse_kind(Some("manual")).unwrap(), Some(SourceKind::Manual));
        assert!(matches!(
            parse_kind(Some("paper")),
            Err(AppError::Validation { .. })
        ));
    }
}

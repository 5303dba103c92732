//! Knowledge chunk queries
//!
//! Rows are managed through SeaORM; the `embedding` column is written and
//! searched with sqlx and `pgvector::Vector` binds.

use super::{page_bounds, Page, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::Utc;
use pgvector::Vector;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use uuid::Uuid;

/// A chunk ready to be written, embedding included
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub owner_id: Uuid,
    pub source_type: SourceKind,
    pub source_id: Option<Uuid>,
    pub chunk_index: i32,
    pub title: String,
    pub content: String,
    pub content_hash: String,
    pub embedding_model: String,
    pub metadata: serde_json::Value,
    pub embedding: Vec<f32>,
}

/// Similarity search hit
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChunkMatch {
    pub id: Uuid,
    pub source_type: String,
    pub source_id: Option<Uuid>,
    pub chunk_index: i32,
    pub title: String,
    pub content: String,
    pub metadata: serde_json::Value,
    /// Cosine similarity in [-1, 1]
    pub similarity: f64,
}

impl Repository {
    /// Insert one chunk row with its vector
    pub async fn insert_chunk(&self, chunk: NewChunk) -> Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO knowledge_chunks (
                id, owner_id, source_type, source_id, chunk_index, title,
                content, content_hash, embedding_model, metadata, embedding,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(chunk.owner_id)
        .bind(chunk.source_type.as_str())
        .bind(chunk.source_id)
        .bind(chunk.chunk_index)
        .bind(chunk.title)
        .bind(chunk.content)
        .bind(chunk.content_hash)
        .bind(chunk.embedding_model)
        .bind(chunk.metadata)
        .bind(Vector::from(chunk.embedding))
        .execute(self.pool.pg_write())
        .await?;

        Ok(id)
    }

    /// Delete every chunk with the given source key
    ///
    /// A `None` source id matches rows where `source_id IS NULL`.
    pub async fn delete_source_chunks(
        &self,
        owner_id: Uuid,
        kind: SourceKind,
        source_id: Option<Uuid>,
    ) -> Result<u64> {
        let mut delete = ChunkEntity::delete_many()
            .filter(ChunkColumn::OwnerId.eq(owner_id))
            .filter(ChunkColumn::SourceType.eq(kind.as_str()));

        delete = match source_id {
            Some(id) => delete.filter(ChunkColumn::SourceId.eq(id)),
            None => delete.filter(ChunkColumn::SourceId.is_null()),
        };

        let result = delete.exec(self.write_conn()).await?;
        Ok(result.rows_affected)
    }

    /// Delete every chunk of a source kind
    pub async fn clear_kind(&self, owner_id: Uuid, kind: SourceKind) -> Result<u64> {
        let result = ChunkEntity::delete_many()
            .filter(ChunkColumn::OwnerId.eq(owner_id))
            .filter(ChunkColumn::SourceType.eq(kind.as_str()))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    /// Delete chunks of a kind whose source is not in `keep`
    pub async fn prune_kind(&self, owner_id: Uuid, kind: SourceKind, keep: &[Uuid]) -> Result<u64> {
        let mut delete = ChunkEntity::delete_many()
            .filter(ChunkColumn::OwnerId.eq(owner_id))
            .filter(ChunkColumn::SourceType.eq(kind.as_str()));
        if !keep.is_empty() {
            delete = delete.filter(
                ChunkColumn::SourceId
                    .is_null()
                    .or(ChunkColumn::SourceId.is_not_in(keep.iter().copied())),
            );
        }

        let result = delete.exec(self.write_conn()).await?;
        Ok(result.rows_affected)
    }

    /// Nearest chunks by cosine similarity, best first
    pub async fn match_chunks(
        &self,
        owner_id: Uuid,
        embedding: &[f32],
        match_count: usize,
        min_similarity: f64,
    ) -> Result<Vec<ChunkMatch>> {
        let matches = sqlx::query_as::<_, ChunkMatch>(
            r#"
            SELECT
                id, source_type, source_id, chunk_index, title, content, metadata,
                (1 - (embedding <=> $1))::float8 AS similarity
            FROM knowledge_chunks
            WHERE owner_id = $2
              AND embedding IS NOT NULL
              AND 1 - (embedding <=> $1) >= $3
            ORDER BY embedding <=> $1
            LIMIT $4
            "#,
        )
        .bind(Vector::from(embedding.to_vec()))
        .bind(owner_id)
        .bind(min_similarity)
        .bind(match_count as i64)
        .fetch_all(self.pool.pg_read())
        .await?;

        Ok(matches)
    }

    /// List chunks, optionally restricted to one source kind
    pub async fn list_chunks(
        &self,
        owner_id: Uuid,
        kind: Option<SourceKind>,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<Page<Chunk>> {
        let (page_index, per_page) = page_bounds(page, per_page);

        let mut query = ChunkEntity::find().filter(ChunkColumn::OwnerId.eq(owner_id));
        if let Some(kind) = kind {
            query = query.filter(ChunkColumn::SourceType.eq(kind.as_str()));
        }

        let paginator = query
            .order_by_asc(ChunkColumn::SourceType)
            .order_by_asc(ChunkColumn::Title)
            .order_by_asc(ChunkColumn::ChunkIndex)
            .paginate(self.read_conn(), per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_index).await?;

        Ok(Page { items, total, page: page_index + 1, per_page })
    }

    pub async fn find_chunk(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Chunk>> {
        ChunkEntity::find_by_id(id)
            .filter(ChunkColumn::OwnerId.eq(owner_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Update title and metadata without touching the vector
    pub async fn update_chunk_meta(
        &self,
        owner_id: Uuid,
        id: Uuid,
        title: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Chunk> {
        let existing = self
            .find_chunk(owner_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("chunk", id))?;

        let mut chunk: ChunkActiveModel = existing.into();
        if let Some(title) = title {
            chunk.title = Set(title);
        }
        if let Some(metadata) = metadata {
            chunk.metadata = Set(metadata);
        }
        chunk.updated_at = Set(Utc::now().into());

        chunk.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Replace a chunk's content together with its embedding
    pub async fn replace_chunk_content(
        &self,
        owner_id: Uuid,
        id: Uuid,
        content: &str,
        content_hash: &str,
        embedding_model: &str,
        embedding: Vec<f32>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE knowledge_chunks
            SET content = $1, content_hash = $2, embedding_model = $3,
                embedding = $4, updated_at = NOW()
            WHERE id = $5 AND owner_id = $6
            "#,
        )
        .bind(content)
        .bind(content_hash)
        .bind(embedding_model)
        .bind(Vector::from(embedding))
        .bind(id)
        .bind(owner_id)
        .execute(self.pool.pg_write())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("chunk", id));
        }

        Ok(())
    }

    pub async fn delete_chunk(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = ChunkEntity::delete_many()
            .filter(ChunkColumn::OwnerId.eq(owner_id))
            .filter(ChunkColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_delete_without_source_id_filters_on_null() {
        let conn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 3 }])
                .into_connection(),
        );
        let repo = Repository::new(DbPool::from_shared(conn.clone()));
        let owner = Uuid::new_v4();

        let deleted = repo
            .delete_source_chunks(owner, SourceKind::Resume, None)
            .await
            .unwrap();
        assert_eq!(deleted, 3);

        drop(repo);
        let log = Arc::into_inner(conn)
            .expect("repository released its handle")
            .into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("IS NULL"));
    }

    #[tokio::test]
    async fn test_prune_keeps_listed_sources() {
        let conn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 2 }])
                .into_connection(),
        );
        let repo = Repository::new(DbPool::from_shared(conn.clone()));
        let kept = Uuid::new_v4();

        let pruned = repo.prune_kind(Uuid::new_v4(), SourceKind::Article, &[kept]).await.unwrap();
        assert_eq!(pruned, 2);

        drop(repo);
        let log = Arc::into_inner(conn)
            .expect("repository released its handle")
            .into_transaction_log();
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("NOT IN"));
        assert!(sql.contains(&kept.to_string()));
    }

    #[tokio::test]
    async fn test_update_meta_on_missing_chunk() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Chunk>::new()])
            .into_connection();
        let repo = Repository::new(DbPool::from_connection(db));

        let err = repo
            .update_chunk_meta(Uuid::new_v4(), Uuid::new_v4(), Some("t".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}

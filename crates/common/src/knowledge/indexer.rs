//! Knowledge indexer
//!
//! Chunks documents, embeds them in fixed-size batches and writes the
//! resulting rows. A failing batch is counted, never fatal.

use super::chunker::{chunk_text, ChunkingConfig, TextChunk};
use super::sources::{published_documents, SourceDocument};
use crate::db::models::SourceKind;
use crate::db::{NewChunk, Repository};
use crate::embeddings::Embedder;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Persistence the indexer needs
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn delete_source(
        &self,
        owner_id: Uuid,
        kind: SourceKind,
        source_id: Option<Uuid>,
    ) -> Result<u64>;

    async fn clear_kind(&self, owner_id: Uuid, kind: SourceKind) -> Result<u64>;

    /// Delete chunks of `kind` whose source id is not in `keep`
    async fn prune_kind(&self, owner_id: Uuid, kind: SourceKind, keep: &[Uuid]) -> Result<u64>;

    async fn insert_chunk(&self, chunk: NewChunk) -> Result<Uuid>;

    async fn published_documents(&self, owner_id: Uuid) -> Result<Vec<SourceDocument>>;
}

#[async_trait]
impl KnowledgeStore for Repository {
    async fn delete_source(
        &self,
        owner_id: Uuid,
        kind: SourceKind,
        source_id: Option<Uuid>,
    ) -> Result<u64> {
        self.delete_source_chunks(owner_id, kind, source_id).await
    }

    async fn clear_kind(&self, owner_id: Uuid, kind: SourceKind) -> Result<u64> {
        Repository::clear_kind(self, owner_id, kind).await
    }

    async fn prune_kind(&self, owner_id: Uuid, kind: SourceKind, keep: &[Uuid]) -> Result<u64> {
        Repository::prune_kind(self, owner_id, kind, keep).await
    }

    async fn insert_chunk(&self, chunk: NewChunk) -> Result<Uuid> {
        Repository::insert_chunk(self, chunk).await
    }

    async fn published_documents(&self, owner_id: Uuid) -> Result<Vec<SourceDocument>> {
        published_documents(self, owner_id).await
    }
}

/// Counts from one or more indexing runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Documents processed
    pub sources: usize,
    /// Chunks produced by the chunker
    pub chunks: usize,
    /// Rows written
    pub inserted: usize,
    /// Chunks lost to embedding or insert failures
    pub failed: usize,
}

impl IndexReport {
    pub fn merge(&mut self, other: IndexReport) {
        self.sources += other.sources;
        self.chunks += other.chunks;
        self.inserted += other.inserted;
        self.failed += other.failed;
    }

    /// True when chunks were produced but none were stored
    pub fn all_failed(&self) -> bool {
        self.chunks > 0 && self.inserted == 0
    }
}

pub struct Indexer {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
        batch_size: usize,
    ) -> Self {
        Self { store, embedder, chunking, batch_size: batch_size.max(1) }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Replace the chunks of one document
    #[instrument(skip(self, document), fields(kind = %document.kind, source_id = ?document.source_id))]
    pub async fn index_document(
        &self,
        owner_id: Uuid,
        document: &SourceDocument,
    ) -> Result<IndexReport> {
        self.store
            .delete_source(owner_id, document.kind, document.source_id)
            .await?;

        self.write_document(owner_id, document).await
    }

    /// Drop chunks of a source that was deleted or unpublished
    pub async fn remove_source(
        &self,
        owner_id: Uuid,
        kind: SourceKind,
        source_id: Uuid,
    ) -> Result<u64> {
        let removed = self.store.delete_source(owner_id, kind, Some(source_id)).await?;
        info!(kind = %kind, source_id = %source_id, removed, "Source chunks removed");
        Ok(removed)
    }

    /// Replace every `resume` chunk of the owner
    pub async fn index_resume(
        &self,
        owner_id: Uuid,
        title: &str,
        text: &str,
    ) -> Result<IndexReport> {
        self.store.clear_kind(owner_id, SourceKind::Resume).await?;
        self.write_document(owner_id, &SourceDocument::resume(title, text)).await
    }

    /// Rebuild the index from every published content row
    ///
    /// Each source is replaced in turn, so an interrupted run leaves every
    /// other source searchable. Chunks of sources that are no longer
    /// published are pruned once all documents are written. Resume and
    /// manual chunks are left alone.
    #[instrument(skip(self))]
    pub async fn reindex_all(&self, owner_id: Uuid) -> Result<IndexReport> {
        let documents = self.store.published_documents(owner_id).await?;

        let mut report = IndexReport::default();
        for document in &documents {
            report.merge(self.index_document(owner_id, document).await?);
        }

        for kind in SourceKind::CONTENT {
            let keep: Vec<Uuid> = documents
                .iter()
                .filter(|d| d.kind == kind)
                .filter_map(|d| d.source_id)
                .collect();
            let pruned = self.store.prune_kind(owner_id, kind, &keep).await?;
            if pruned > 0 {
                info!(kind = %kind, pruned, "Stale chunks pruned");
            }
        }

        info!(
            sources = report.sources,
            chunks = report.chunks,
            inserted = report.inserted,
            failed = report.failed,
            "Full reindex complete"
        );

        Ok(report)
    }

    async fn write_document(
        &self,
        owner_id: Uuid,
        document: &SourceDocument,
    ) -> Result<IndexReport> {
        let chunks = chunk_text(&document.text, &self.chunking);
        let mut report = IndexReport { sources: 1, chunks: chunks.len(), ..Default::default() };

        for (batch_number, batch) in chunks.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let vectors = match self.embedder.embed_batch(&texts).await {
                Ok(vectors) if vectors.len() == batch.len() => vectors,
                Ok(vectors) => {
                    warn!(
                        batch = batch_number,
                        expected = batch.len(),
                        received = vectors.len(),
                        "Embedding count mismatch, skipping batch"
                    );
                    report.failed += batch.len();
                    continue;
                }
                Err(e) => {
                    warn!(batch = batch_number, size = batch.len(), error = %e, "Embedding batch failed");
                    report.failed += batch.len();
                    continue;
                }
            };

            for (chunk, embedding) in batch.iter().zip(vectors) {
                match self.store.insert_chunk(self.new_chunk(owner_id, document, chunk, embedding)).await {
                    Ok(_) => report.inserted += 1,
                    Err(e) => {
                        warn!(chunk_index = chunk.index, error = %e, "Chunk insert failed");
                        report.failed += 1;
                    }
                }
            }
        }

        crate::metrics::record_indexing(document.kind.as_str(), report.inserted, report.failed);
        Ok(report)
    }

    fn new_chunk(
        &self,
        owner_id: Uuid,
        document: &SourceDocument,
        chunk: &TextChunk,
        embedding: Vec<f32>,
    ) -> NewChunk {
        NewChunk {
            owner_id,
            source_type: document.kind,
            source_id: document.source_id,
            chunk_index: chunk.index,
            title: document.title.clone(),
            content: chunk.content.clone(),
            content_hash: chunk.content_hash.clone(),
            embedding_model: self.embedder.model_name().to_string(),
            metadata: document.metadata.clone(),
            embedding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<NewChunk>>,
        deletes: Mutex<Vec<(SourceKind, Option<Uuid>)>>,
        cleared: Mutex<Vec<SourceKind>>,
        pruned: Mutex<Vec<(SourceKind, Vec<Uuid>)>>,
        documents: Vec<SourceDocument>,
        reject_index: Option<i32>,
    }

    #[async_trait]
    impl KnowledgeStore for MemoryStore {
        async fn delete_source(
            &self,
            _owner_id: Uuid,
            kind: SourceKind,
            source_id: Option<Uuid>,
        ) -> Result<u64> {
            self.deletes.lock().unwrap().push((kind, source_id));
            Ok(0)
        }

        async fn clear_kind(&self, _owner_id: Uuid, kind: SourceKind) -> Result<u64> {
            self.cleared.lock().unwrap().push(kind);
            Ok(0)
        }

        async fn prune_kind(
            &self,
            _owner_id: Uuid,
            kind: SourceKind,
            keep: &[Uuid],
        ) -> Result<u64> {
            self.pruned.lock().unwrap().push((kind, keep.to_vec()));
            Ok(0)
        }

        async fn insert_chunk(&self, chunk: NewChunk) -> Result<Uuid> {
            if self.reject_index == Some(chunk.chunk_index) {
                return Err(AppError::Internal { message: "insert rejected".into() });
            }
            self.rows.lock().unwrap().push(chunk);
            Ok(Uuid::new_v4())
        }

        async fn published_documents(&self, _owner_id: Uuid) -> Result<Vec<SourceDocument>> {
            Ok(self.documents.clone())
        }
    }

    /// Fails the n-th call (0-based); optionally drops a vector instead
    struct FlakyEmbedder {
        inner: MockEmbedder,
        calls: AtomicUsize,
        fail_call: usize,
        short_instead: bool,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut vectors = self.inner.embed_batch(texts).await?;
            if call == self.fail_call {
                if self.short_instead {
                    vectors.pop();
                } else {
                    return Err(AppError::EmbeddingError { message: "upstream 503".into() });
                }
            }
            Ok(vectors)
        }

        fn model_name(&self) -> &str {
            "flaky"
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    /// Five paragraphs that become five chunks under a 70-char budget
    fn five_chunk_document() -> SourceDocument {
        let text = (0..5)
            .map(|i| format!("Paragraph number {} describes one more thing about me.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        SourceDocument::manual(Uuid::new_v4(), "Notes", text, None)
    }

    fn indexer(store: Arc<MemoryStore>, embedder: Arc<dyn Embedder>) -> Indexer {
        Indexer::new(store, embedder, ChunkingConfig { max_chars: 70, min_chars: 10 }, 2)
    }

    fn flaky(fail_call: usize, short_instead: bool) -> Arc<FlakyEmbedder> {
        Arc::new(FlakyEmbedder {
            inner: MockEmbedder::new(4),
            calls: AtomicUsize::new(0),
            fail_call,
            short_instead,
        })
    }

    #[tokio::test]
    async fn test_failed_batch_counts_its_items() {
        let store = Arc::new(MemoryStore::default());
        let indexer = indexer(store.clone(), flaky(1, false));

        let report = indexer.index_document(Uuid::nil(), &five_chunk_document()).await.unwrap();

        assert_eq!(report, IndexReport { sources: 1, chunks: 5, inserted: 3, failed: 2 });
        let indices: Vec<i32> = store.rows.lock().unwrap().iter().map(|r| r.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 4]);
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_fails_whole_batch() {
        let store = Arc::new(MemoryStore::default());
        let indexer = indexer(store.clone(), flaky(0, true));

        let report = indexer.index_document(Uuid::nil(), &five_chunk_document()).await.unwrap();

        assert_eq!(report.inserted, 3);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn test_insert_failure_counts_single_chunk() {
        let store = Arc::new(MemoryStore { reject_index: Some(3), ..Default::default() });
        let indexer = indexer(store.clone(), Arc::new(MockEmbedder::new(4)));

        let report = indexer.index_document(Uuid::nil(), &five_chunk_document()).await.unwrap();

        assert_eq!(report.inserted, 4);
        assert_eq!(report.failed, 1);
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn test_index_document_replaces_source_key() {
        let store = Arc::new(MemoryStore::default());
        let indexer = indexer(store.clone(), Arc::new(MockEmbedder::new(4)));
        let document = five_chunk_document();

        indexer.index_document(Uuid::nil(), &document).await.unwrap();

        assert_eq!(
            *store.deletes.lock().unwrap(),
            vec![(SourceKind::Manual, document.source_id)]
        );
        let rows = store.rows.lock().unwrap();
        assert!(rows.iter().all(|r| r.source_id == document.source_id && r.title == "Notes"));
        assert!(rows.iter().all(|r| r.embedding.len() == 4 && r.embedding_model == "mock-embedding"));
    }

    fn article_document(id: Uuid) -> SourceDocument {
        SourceDocument {
            kind: SourceKind::Article,
            ..SourceDocument::manual(id, "Post", five_chunk_document().text, None)
        }
    }

    #[tokio::test]
    async fn test_reindex_all_replaces_per_source_then_prunes() {
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        let store = Arc::new(MemoryStore {
            documents: vec![article_document(first), article_document(second)],
            ..Default::default()
        });
        let indexer = indexer(store.clone(), Arc::new(MockEmbedder::new(4)));

        let report = indexer.reindex_all(Uuid::nil()).await.unwrap();

        assert_eq!(report, IndexReport { sources: 2, chunks: 10, inserted: 10, failed: 0 });
        assert!(store.cleared.lock().unwrap().is_empty());
        assert_eq!(
            *store.deletes.lock().unwrap(),
            vec![(SourceKind::Article, Some(first)), (SourceKind::Article, Some(second))]
        );

        let pruned = store.pruned.lock().unwrap();
        let kinds: Vec<SourceKind> = pruned.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, SourceKind::CONTENT.to_vec());
        for (kind, keep) in pruned.iter() {
            if *kind == SourceKind::Article {
                assert_eq!(keep, &vec![first, second]);
            } else {
                assert!(keep.is_empty());
            }
        }
    }

    /// Embeds slowly so a run can be interrupted between documents
    struct SlowEmbedder(MockEmbedder);

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.0.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.0.embed_batch(texts).await
        }

        fn model_name(&self) -> &str {
            "slow"
        }

        fn dimension(&self) -> usize {
            self.0.dimension()
        }
    }

    #[tokio::test]
    async fn test_interrupted_reindex_leaves_untouched_sources_alone() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let store = Arc::new(MemoryStore {
            documents: ids.iter().map(|id| article_document(*id)).collect(),
            ..Default::default()
        });
        let indexer = indexer(store.clone(), Arc::new(SlowEmbedder(MockEmbedder::new(4))));

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(120),
            indexer.reindex_all(Uuid::nil()),
        )
        .await;

        assert!(outcome.is_err());
        assert!(store.cleared.lock().unwrap().is_empty());
        assert!(store.pruned.lock().unwrap().is_empty());
        // Only sources the run reached were replaced
        let touched: Vec<Option<Uuid>> =
            store.deletes.lock().unwrap().iter().map(|(_, id)| *id).collect();
        assert!(touched.len() < ids.len());
        assert!(!touched.contains(&Some(ids[2])));
    }

    #[tokio::test]
    async fn test_resume_clears_resume_kind() {
        let store = Arc::new(MemoryStore::default());
        let indexer = indexer(store.clone(), Arc::new(MockEmbedder::new(4)));

        let report = indexer
            .index_resume(Uuid::nil(), "Resume", "Ten years of backend work across fintech and infra.")
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(*store.cleared.lock().unwrap(), vec![SourceKind::Resume]);
        assert!(store.rows.lock().unwrap()[0].source_id.is_none());
    }

    #[test]
    fn test_report_merge() {
        let mut total = IndexReport::default();
        total.merge(IndexReport { sources: 1, chunks: 4, inserted: 4, failed: 0 });
        total.merge(IndexReport { sources: 1, chunks: 2, inserted: 0, failed: 2 });
        assert_eq!(total, IndexReport { sources: 2, chunks: 6, inserted: 4, failed: 2 });
        assert!(IndexReport { sources: 1, chunks: 2, inserted: 0, failed: 2 }.all_failed());
        assert!(!IndexReport::default().all_failed());
    }
}

//! Knowledge index for the digital twin
//!
//! Provides:
//! - Paragraph chunking under a character budget
//! - Source documents built from content rows
//! - Batched embedding and chunk writes

pub mod chunker;
pub mod indexer;
pub mod sources;

pub use chunker::{chunk_text, content_hash, ChunkingConfig, TextChunk};
pub use indexer::{IndexReport, Indexer, KnowledgeStore};
pub use sources::{published_documents, SourceDocument};

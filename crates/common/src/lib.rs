//! Folio Common Library
//!
//! Shared code for the Folio gateway and ingest tools including:
//! - Database models and repository patterns
//! - Embedding and chat-completion client abstractions
//! - The knowledge index and the digital twin
//! - Error types and handling
//! - Configuration management
//! - Session and CSRF utilities
//! - Metrics

pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod knowledge;
pub mod metrics;
pub mod slug;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

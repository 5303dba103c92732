//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations.
//! Every method takes the owning tenant explicitly; nothing here
//! falls back to an ambient owner.

mod articles;
mod chunks;
mod experiences;
mod projects;
mod skills;
mod stories;

pub use chunks::{ChunkMatch, NewChunk};

use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Default page size for paginated listings
pub const DEFAULT_PER_PAGE: u64 = 20;

/// Upper bound on page size
pub const MAX_PER_PAGE: u64 = 100;

/// Highest 1-based page number served; larger requests get this page
pub const MAX_PAGE: u64 = 1_000_000;

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Normalise 1-based page parameters into (zero-based page, page size)
pub(crate) fn page_bounds(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE) - 1;
    (page, per_page)
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

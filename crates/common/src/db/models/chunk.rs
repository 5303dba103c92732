//! Knowledge chunk entity
//!
//! The `embedding vector(N)` column is not mapped here; every vector
//! read and write goes through sqlx with `pgvector::Vector`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Kind of entity a chunk was derived from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Article,
    Project,
    Skill,
    Story,
    Experience,
    Resume,
    Manual,
}

impl SourceKind {
    /// Kinds rebuilt from content tables by a full reindex
    pub const CONTENT: [SourceKind; 5] = [
        SourceKind::Article,
        SourceKind::Project,
        SourceKind::Skill,
        SourceKind::Story,
        SourceKind::Experience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Article => "article",
            SourceKind::Project => "project",
            SourceKind::Skill => "skill",
            SourceKind::Story => "story",
            SourceKind::Experience => "experience",
            SourceKind::Resume => "resume",
            SourceKind::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "article" => Some(SourceKind::Article),
            "project" => Some(SourceKind::Project),
            "skill" => Some(SourceKind::Skill),
            "story" => Some(SourceKind::Story),
            "experience" => Some(SourceKind::Experience),
            "resume" => Some(SourceKind::Resume),
            "manual" => Some(SourceKind::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "knowledge_chunks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub source_type: String,

    /// Originating row; `None` for resume and manual chunks
    pub source_id: Option<Uuid>,

    pub chunk_index: i32,

    /// Display title of the source
    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Hex sha256 of `content`
    #[sea_orm(column_type = "Text")]
    pub content_hash: String,

    /// Embedding model identifier for versioning
    #[sea_orm(column_type = "Text")]
    pub embedding_model: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Admin payload for a manual knowledge entry
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct KnowledgeInput {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(min = 1, max = 200000))]
    pub content: String,

    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Admin payload for editing a single chunk
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChunkUpdate {
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 20000))]
    pub content: Option<String>,

    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_strings() {
        for kind in SourceKind::CONTENT {
            assert_eq!(SourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SourceKind::parse("resume"), Some(SourceKind::Resume));
        assert_eq!(SourceKind::parse("paper"), None);
        assert_eq!(SourceKind::Manual.to_string(), "manual");
    }
}

//! Article entity

use super::ContentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub excerpt: String,

    /// Markdown body
    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Tags as a JSONB array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Json,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Set the first time the article is published
    pub published_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn content_status(&self) -> ContentStatus {
        ContentStatus::from(self.status.clone())
    }

    pub fn tag_list(&self) -> Vec<String> {
        super::project::string_list(&self.tags)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Admin payload for creating or replacing an article
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ArticleInput {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    /// Explicit slug; derived from the title when absent
    #[validate(length(max = 120))]
    pub slug: Option<String>,

    #[serde(default)]
    #[validate(length(max = 1000))]
    pub excerpt: String,

    #[validate(length(max = 200000))]
    pub body: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub status: ContentStatus,
}

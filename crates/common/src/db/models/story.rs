//! Story entity: longer personal anecdotes the twin can draw on

use super::ContentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn content_status(&self) -> ContentStatus {
        ContentStatus::from(self.status.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StoryInput {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(max = 120))]
    pub slug: Option<String>,

    #[validate(length(min = 1, max = 100000))]
    pub body: String,

    #[serde(default)]
    pub status: ContentStatus,
}

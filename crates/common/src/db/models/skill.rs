//! Skill entity

use super::ContentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "skills")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub category: String,

    /// Proficiency from 1 to 5
    pub level: i32,

    #[sea_orm(column_type = "Text")]
    pub description: String,

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
pub struct SkillInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 120))]
    pub category: String,

    #[validate(range(min = 1, max = 5))]
    pub level: i32,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,

    #[serde(default)]
    pub status: ContentStatus,
}

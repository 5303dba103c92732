//! Experience entity (work history)

use super::ContentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "experiences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub company: String,

    #[sea_orm(column_type = "Text")]
    pub role: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub location: Option<String>,

    pub start_date: Date,

    /// `None` while the position is current
    pub end_date: Option<Date>,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Highlights as a JSONB array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub highlights: Json,

    pub sort_order: i32,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn content_status(&self) -> ContentStatus {
        ContentStatus::from(self.status.clone())
    }

    pub fn highlight_list(&self) -> Vec<String> {
        super::project::string_list(&self.highlights)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExperienceInput {
    #[validate(length(min = 1, max = 200))]
    pub company: String,

    #[validate(length(min = 1, max = 200))]
    pub role: String,

    #[validate(length(max = 200))]
    pub location: Option<String>,

    pub start_date: chrono::NaiveDate,

    pub end_date: Option<chrono::NaiveDate>,

    #[serde(default)]
    #[validate(length(max = 20000))]
    pub description: String,

    #[serde(default)]
    pub highlights: Vec<String>,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default)]
    pub status: ContentStatus,
}

impl ExperienceInput {
    /// End date, when present, may not precede the start date
    pub fn check_dates(&self) -> crate::errors::Result<()> {
        match self.end_date {
            Some(end) if end < self.start_date => Err(crate::errors::AppError::Validation {
                message: "end_date precedes start_date".to_string(),
                field: Some("end_date".to_string()),
            }),
            _ => Ok(()),
        }
    }
}

//! Project entity

use super::ContentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub slug: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub summary: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    /// Technologies as a JSONB array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub tech_stack: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub repo_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub live_url: Option<String>,

    pub featured: bool,

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

    /// Tech stack entries as plain strings
    pub fn tech_list(&self) -> Vec<String> {
        string_list(&self.tech_stack)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Admin payload for creating or replacing a project
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(max = 120))]
    pub slug: Option<String>,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub summary: String,

    #[serde(default)]
    #[validate(length(max = 100000))]
    pub body: String,

    #[serde(default)]
    pub tech_stack: Vec<String>,

    #[validate(url, custom(function = "validate_link"))]
    pub repo_url: Option<String>,

    #[validate(url, custom(function = "validate_link"))]
    pub live_url: Option<String>,

    #[serde(default)]
    pub featured: bool,

    #[serde(default)]
    pub sort_order: i32,

    #[serde(default)]
    pub status: ContentStatus,
}

/// Whether a link is safe to place in an `href`: absolute `http` or `https` only
pub fn is_http_url(url: &str) -> bool {
    let url = url.trim_start();
    ["http://", "https://"].iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn validate_link(url: &str) -> Result<(), ValidationError> {
    if is_http_url(url) {
        Ok(())
    } else {
        Err(ValidationError::new("http_url"))
    }
}

/// Read a JSONB array of strings, ignoring non-string entries
pub(crate) fn string_list(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

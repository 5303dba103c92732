//! Publication status shared by every content entity

use serde::{Deserialize, Serialize};

/// Content status enum
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, ContentStatus::Published)
    }
}

impl From<String> for ContentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "published" => ContentStatus::Published,
            "archived" => ContentStatus::Archived,
            _ => ContentStatus::Draft,
        }
    }
}

impl From<ContentStatus> for String {
    fn from(status: ContentStatus) -> Self {
        status.as_str().to_string()
    }
}

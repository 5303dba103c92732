//! API handlers module

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod pages;
pub mod public;

use serde::Deserialize;

/// `?page=&per_page=` query parameters (1-based page)
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

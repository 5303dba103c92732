//! Digital twin chat endpoint

use axum::{extract::State, Json};
use folio_common::{
    chat::{ChatMessage, TwinAnswer},
    errors::{AppError, Result},
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,

    /// Prior turns, oldest first
    #[serde(default)]
    #[validate(length(max = 50))]
    pub history: Vec<ChatMessage>,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TwinAnswer>> {
    request.validate()?;

    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation {
            message: "message must not be blank".to_string(),
            field: Some("message".to_string()),
        });
    }

    let answer = state
        .twin
        .answer(state.owner_id(), message, &request.history)
        .await?;

    tracing::info!(
        citations = answer.citations.len(),
        model = %answer.model,
        "Twin answered"
    );

    Ok(Json(answer))
}

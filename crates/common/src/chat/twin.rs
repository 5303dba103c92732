//! The digital twin: retrieval-augmented answers about the site owner
//!
//! Provides:
//! - Question embedding and similarity retrieval
//! - Persona prompt with numbered context blocks
//! - Citation extraction from the model's `[n]` markers

use super::{ChatMessage, ChatModel, ChatRole, CompletionOptions};
use crate::config::{ChatConfig, SiteConfig};
use crate::db::{ChunkMatch, Repository};
use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const EXCERPT_CHARS: usize = 200;

/// Source of context chunks for a question
#[async_trait]
pub trait ChunkRetriever: Send + Sync {
    async fn match_chunks(
        &self,
        owner_id: Uuid,
        embedding: &[f32],
        match_count: usize,
        min_similarity: f64,
    ) -> Result<Vec<ChunkMatch>>;
}

#[async_trait]
impl ChunkRetriever for Repository {
    async fn match_chunks(
        &self,
        owner_id: Uuid,
        embedding: &[f32],
        match_count: usize,
        min_similarity: f64,
    ) -> Result<Vec<ChunkMatch>> {
        Repository::match_chunks(self, owner_id, embedding, match_count, min_similarity).await
    }
}

/// Reference from an answer back to a retrieved chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Context block number (1-based) as cited in the answer
    pub index: usize,
    pub source_type: String,
    pub source_id: Option<Uuid>,
    pub title: String,
    pub excerpt: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TwinAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub model: String,
}

/// Tunables for retrieval and generation
#[derive(Debug, Clone)]
pub struct TwinSettings {
    pub persona_name: String,
    pub match_count: usize,
    pub min_similarity: f64,
    pub max_history: usize,
    pub completion: CompletionOptions,
}

impl TwinSettings {
    pub fn from_config(site: &SiteConfig, chat: &ChatConfig) -> Self {
        Self {
            persona_name: site.persona_name.clone(),
            match_count: chat.match_count,
            min_similarity: chat.min_similarity,
            max_history: chat.max_history,
            completion: CompletionOptions {
                max_tokens: chat.max_tokens,
                temperature: chat.temperature,
            },
        }
    }
}

pub struct Twin {
    retriever: Arc<dyn ChunkRetriever>,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn ChatModel>,
    settings: TwinSettings,
    citation_pattern: Regex,
}

impl Twin {
    pub fn new(
        retriever: Arc<dyn ChunkRetriever>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        settings: TwinSettings,
    ) -> Result<Self> {
        let citation_pattern = Regex::new(r"\[(\d+)\]").map_err(|e| AppError::Internal {
            message: format!("Invalid citation pattern: {}", e),
        })?;

        Ok(Self { retriever, embedder, model, settings, citation_pattern })
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Answer a visitor's question in the owner's voice
    #[tracing::instrument(skip(self, question, history), fields(history = history.len()))]
    pub async fn answer(
        &self,
        owner_id: Uuid,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<TwinAnswer> {
        let start = Instant::now();
        let result = self.answer_inner(owner_id, question, history).await;

        let cited = result.as_ref().map(|a| a.citations.len()).unwrap_or(0);
        crate::metrics::record_chat(
            start.elapsed().as_secs_f64(),
            self.model.model_name(),
            cited,
            result.is_ok(),
        );

        result
    }

    async fn answer_inner(
        &self,
        owner_id: Uuid,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<TwinAnswer> {
        let embedding = self.embedder.embed(question).await?;

        let chunks = self
            .retriever
            .match_chunks(
                owner_id,
                &embedding,
                self.settings.match_count,
                self.settings.min_similarity,
            )
            .await?;

        tracing::debug!(retrieved = chunks.len(), "Context retrieved");

        let messages = self.build_messages(question, history, &chunks);
        let answer = self.model.complete(&messages, &self.settings.completion).await?;
        let citations = self.extract_citations(&answer, &chunks);

        Ok(TwinAnswer {
            answer,
            citations,
            model: self.model.model_name().to_string(),
        })
    }

    /// System prompt, the most recent history turns, then the question
    fn build_messages(
        &self,
        question: &str,
        history: &[ChatMessage],
        chunks: &[ChunkMatch],
    ) -> Vec<ChatMessage> {
        let turns: Vec<&ChatMessage> = history
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .collect();
        let skip = turns.len().saturating_sub(self.settings.max_history);

        let mut messages = Vec::with_capacity(turns.len() - skip + 2);
        messages.push(ChatMessage::system(self.system_prompt(chunks)));
        messages.extend(turns.into_iter().skip(skip).cloned());
        messages.push(ChatMessage::user(question));
        messages
    }

    fn system_prompt(&self, chunks: &[ChunkMatch]) -> String {
        let persona = &self.settings.persona_name;

        let mut prompt = format!(
            "You are the digital twin of {persona}, answering visitors to {persona}'s \
            portfolio in the first person. Answer ONLY from the context below and do \
            not make up facts.\n"
        );

        if chunks.is_empty() {
            prompt.push_str(
                "\nNo context matched this question. Say plainly that you don't have \
                that information, and suggest asking about projects, writing or experience.",
            );
            return prompt;
        }

        prompt.push_str(
            "Cite the context blocks you rely on with their numbers, like [1]. If the \
            context does not cover the question, say that you don't have that information.\n\n\
            Context:\n",
        );

        for (i, chunk) in chunks.iter().enumerate() {
            prompt.push_str(&format!(
                "\n[{}] ({}) {}\n{}\n",
                i + 1,
                chunk.source_type,
                chunk.title,
                chunk.content
            ));
        }

        prompt
    }

    /// Cited blocks in order of first mention; unknown numbers are ignored
    fn extract_citations(&self, answer: &str, chunks: &[ChunkMatch]) -> Vec<Citation> {
        let mut citations: Vec<Citation> = Vec::new();

        for cap in self.citation_pattern.captures_iter(answer) {
            let Some(idx) = cap.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
                continue;
            };
            if idx == 0 || idx > chunks.len() || citations.iter().any(|c| c.index == idx) {
                continue;
            }

            let chunk = &chunks[idx - 1];
            citations.push(Citation {
                index: idx,
                source_type: chunk.source_type.clone(),
                source_id: chunk.source_id,
                title: chunk.title.clone(),
                excerpt: chunk.content.chars().take(EXCERPT_CHARS).collect(),
                similarity: chunk.similarity,
            });
        }

        citations
    }
}

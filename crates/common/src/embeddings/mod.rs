//! Embedding service abstraction
//!
//! Provides a unified interface over embedding providers:
//! - OpenAI-compatible `/embeddings` endpoints
//! - A deterministic mock for tests and offline development

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, positionally aligned
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// OpenAI embedding client
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "embedding.api_key is required for the openai provider".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            max_retries: config.max_retries,
        })
    }

    fn backoff_policy(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_interval(Duration::from_secs(5))
            .with_max_elapsed_time(Some(Duration::from_secs(60)))
            .build()
    }

    /// Make request with bounded exponential retry
    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0u32;

        let result = retry(self.backoff_policy(), || {
            attempt += 1;
            let current = attempt;
            async move {
                match self.make_request(texts).await {
                    Ok(embeddings) => Ok(embeddings),
                    Err(RequestFailure::Permanent(e)) => Err(backoff::Error::permanent(e)),
                    Err(RequestFailure::Transient(e)) if current > self.max_retries => {
                        Err(backoff::Error::permanent(e))
                    }
                    Err(RequestFailure::Transient(e)) => {
                        tracing::warn!(
                            attempt = current,
                            max_retries = self.max_retries,
                            error = %e,
                            "Embedding request failed, retrying"
                        );
                        Err(backoff::Error::transient(e))
                    }
                }
            }
        })
        .await;

        crate::metrics::record_embedding(&self.model, texts.len(), result.is_ok());
        result
    }

    async fn make_request(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, RequestFailure> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAIRequest { input: texts, model: &self.model };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RequestFailure::Transient(AppError::EmbeddingError {
                    message: format!("Request failed: {}", e),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = AppError::EmbeddingError {
                message: format!("API error {}: {}", status, body),
            };
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                RequestFailure::Transient(error)
            } else {
                RequestFailure::Permanent(error)
            });
        }

        let result: OpenAIResponse = response.json().await.map_err(|e| {
            RequestFailure::Permanent(AppError::EmbeddingError {
                message: format!("Failed to parse response: {}", e),
            })
        })?;

        let mut data = result.data;
        data.sort_by_key(|item| item.index);

        if data.len() != texts.len() {
            return Err(RequestFailure::Permanent(AppError::EmbeddingError {
                message: format!("Expected {} embeddings, got {}", texts.len(), data.len()),
            }));
        }

        if let Some(bad) = data.iter().find(|item| item.embedding.len() != self.dimension) {
            return Err(RequestFailure::Permanent(AppError::EmbeddingError {
                message: format!(
                    "Expected dimension {}, got {}",
                    self.dimension,
                    bad.embedding.len()
                ),
            }));
        }

        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

enum RequestFailure {
    Transient(AppError),
    Permanent(AppError),
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.request_with_retry(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| AppError::EmbeddingError {
            message: "Empty response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_with_retry(texts).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Mock embedder for testing
///
/// Vectors are unit length and derived from a sha256 of the text, so equal
/// texts always embed identically.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let seed = Sha256::digest(text.as_bytes());
        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let byte = seed[i % seed.len()] as f32;
                let phase = (i / seed.len()) as f32;
                ((byte + phase * 31.0) % 256.0) / 127.5 - 1.0
            })
            .collect();

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "mock" => Ok(Arc::new(MockEmbedder::new(config.dimension))),
        other => Err(AppError::Configuration {
            message: format!("Unknown embedding provider: {}", other),
        }),
    }
}

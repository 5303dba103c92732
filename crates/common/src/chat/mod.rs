//! Chat-completion client abstraction
//!
//! `ChatModel` wraps an OpenAI-compatible `/chat/completions` endpoint;
//! `MockChatModel` answers locally for tests and `provider = "mock"`.

mod twin;

pub use twin::{ChunkRetriever, Citation, Twin, TwinAnswer, TwinSettings};

use crate::config::ChatConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Sampling options for one completion
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self { max_tokens: 700, temperature: 0.4 }
    }
}

/// Trait for chat completion
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation, returning the assistant's reply
    async fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions)
        -> Result<String>;

    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat client
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChatModel {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "chat.api_key is required for the openai provider".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base = config
            .api_base
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ChatError {
                message: format!("Chat API request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ChatError {
                message: format!("Chat API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| AppError::ChatError {
            message: format!("Failed to parse chat response: {}", e),
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::ChatError {
                message: "Empty response from chat model".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock chat model for testing
///
/// Cites `[1]` whenever the system prompt carries a numbered context block.
pub struct MockChatModel;

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String> {
        let has_context = messages
            .iter()
            .any(|m| m.role == ChatRole::System && m.content.contains("\n[1] "));

        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        Ok(if has_context {
            format!("Here is what my notes say about \"{}\" [1].", question)
        } else {
            "I don't have that information yet.".to_string()
        })
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

/// Create a chat model based on configuration
pub fn create_chat_model(config: &ChatConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIChatModel::new(config)?)),
        "mock" => Ok(Arc::new(MockChatModel)),
        other => Err(AppError::Configuration {
            message: format!("Unknown chat provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_openai_requires_key() {
        let config = ChatConfig { api_key: Some(String::new()), ..ChatConfig::default() };
        assert!(matches!(
            create_chat_model(&config),
            Err(AppError::Configuration { .. })
        ));
    }

    mod openai {
        use super::*;
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn model(server: &MockServer) -> OpenAIChatModel {
            OpenAIChatModel::new(&ChatConfig {
                provider: "openai".into(),
                api_key: Some("chat-key".into()),
                api_base: Some(format!("{}/v1", server.uri())),
                model: "test-model".into(),
                ..ChatConfig::default()
            })
            .unwrap()
        }

        #[tokio::test]
        async fn test_completion_request_and_reply() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .and(header("authorization", "Bearer chat-key"))
                .and(body_partial_json(serde_json::json!({
                    "model": "test-model",
                    "max_tokens": 50,
                    "messages": [{ "role": "user", "content": "Hi" }]
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": "  Hello there [1]\n" } }]
                })))
                .mount(&server)
                .await;

            let options = CompletionOptions { max_tokens: 50, temperature: 0.0 };
            let reply = model(&server)
                .complete(&[ChatMessage::user("Hi")], &options)
                .await
                .unwrap();

            assert_eq!(reply, "Hello there [1]");
        }

        #[tokio::test]
        async fn test_error_status_and_empty_reply() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
                .up_to_n_times(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "choices": [{ "message": { "content": null } }]
                })))
                .mount(&server)
                .await;

            let model = model(&server);
            let options = CompletionOptions::default();

            let err = model.complete(&[ChatMessage::user("Hi")], &options).await.unwrap_err();
            assert!(matches!(err, AppError::ChatError { .. }));
            assert!(err.to_string().contains("overloaded"));

            let err = model.complete(&[ChatMessage::user("Hi")], &options).await.unwrap_err();
            assert!(err.to_string().contains("Empty response"));
        }
    }

    #[tokio::test]
    async fn test_mock_model_cites_when_context_present() {
        let model = MockChatModel;
        let options = CompletionOptions::default();

        let with_context = [
            ChatMessage::system("Context:\n[1] (article) Intro\nHello"),
            ChatMessage::user("Who are you?"),
        ];
        assert!(model.complete(&with_context, &options).await.unwrap().contains("[1]"));

        let without = [ChatMessage::system("No context."), ChatMessage::user("Who?")];
        assert!(!model.complete(&without, &options).await.unwrap().contains("[1]"));
    }
}

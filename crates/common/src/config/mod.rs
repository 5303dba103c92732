//! Configuration management for Folio services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chat completion configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Admin session configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Site identity and ownership
    #[serde(default)]
    pub site: SiteConfig,

    /// Chunking parameters for the knowledge index
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Allowed CORS origin for the public API (none = same-origin only)
    pub cors_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply pending migrations on startup
    #[serde(default = "default_enabled")]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: openai, mock
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service
    pub api_key: Option<String>,

    /// API base URL (for OpenAI-compatible endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension, must match the `vector(N)` column
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per batch (0 disables retrying)
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Number of texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    /// Chat provider: openai, mock
    #[serde(default = "default_chat_provider")]
    pub provider: String,

    /// API key for the chat completion service
    pub api_key: Option<String>,

    /// API base URL (for OpenAI-compatible endpoints)
    pub api_base: Option<String>,

    /// Model to use
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Number of chunks retrieved per question
    #[serde(default = "default_match_count")]
    pub match_count: usize,

    /// Minimum cosine similarity for a chunk to be used as context
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,

    /// Prior conversation turns forwarded to the model
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret used to sign session tokens
    pub session_secret: Option<String>,

    /// Session lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Argon2 PHC string for the admin password
    pub admin_password_hash: Option<String>,

    /// Mark cookies `Secure`
    #[serde(default = "default_enabled")]
    pub secure_cookies: bool,

    /// Session cookie name
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// CSRF cookie name
    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,

    /// CSRF header name
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Owner of every row served by this deployment
    #[serde(default = "default_owner_id")]
    pub owner_id: Uuid,

    /// Name the twin speaks as
    #[serde(default = "default_persona_name")]
    pub persona_name: String,

    /// Site title used by rendered pages
    #[serde(default = "default_site_title")]
    pub title: String,

    /// Short tagline shown on the home page
    #[serde(default)]
    pub tagline: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KnowledgeConfig {
    /// Character budget per chunk
    #[serde(default = "default_chunk_max_chars")]
    pub max_chars: usize,

    /// Chunks shorter than this are dropped
    #[serde(default = "default_chunk_min_chars")]
    pub min_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Chat requests per minute (process-wide)
    #[serde(default = "default_rate_limit")]
    pub requests_per_minute: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_max_body_bytes() -> usize { 2 * 1024 * 1024 }
fn default_database_url() -> String { "postgres://localhost/folio".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_embedding_provider() -> String { "openai".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { 1536 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 2 }
fn default_batch_size() -> usize { 32 }
fn default_chat_provider() -> String { "openai".to_string() }
fn default_chat_model() -> String { "gpt-4o-mini".to_string() }
fn default_chat_timeout() -> u64 { 45 }
fn default_max_tokens() -> u32 { 700 }
fn default_temperature() -> f32 { 0.4 }
fn default_match_count() -> usize { 6 }
fn default_min_similarity() -> f64 { 0.2 }
fn default_max_history() -> usize { 10 }
fn default_session_ttl() -> u64 { 60 * 60 * 12 }
fn default_session_cookie() -> String { "session".to_string() }
fn default_csrf_cookie() -> String { "csrf".to_string() }
fn default_csrf_header() -> String { "x-csrf-token".to_string() }
fn default_owner_id() -> Uuid { Uuid::nil() }
fn default_persona_name() -> String { "the site owner".to_string() }
fn default_site_title() -> String { "Portfolio".to_string() }
fn default_chunk_max_chars() -> usize { 1000 }
fn default_chunk_min_chars() -> usize { 50 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 5 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }

    /// Owner id every query is scoped to
    pub fn owner_id(&self) -> Uuid {
        self.site.owner_id
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
            cors_origin: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: default_enabled(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_chat_provider(),
            api_key: None,
            api_base: None,
            model: default_chat_model(),
            timeout_secs: default_chat_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            match_count: default_match_count(),
            min_similarity: default_min_similarity(),
            max_history: default_max_history(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            session_ttl_secs: default_session_ttl(),
            admin_password_hash: None,
            secure_cookies: default_enabled(),
            session_cookie: default_session_cookie(),
            csrf_cookie: default_csrf_cookie(),
            csrf_header: default_csrf_header(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            owner_id: default_owner_id(),
            persona_name: default_persona_name(),
            title: default_site_title(),
            tagline: String::new(),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_max_chars(),
            min_chars: default_chunk_min_chars(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

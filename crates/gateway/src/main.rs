//! Folio Gateway
//!
//! The single HTTP entry point of the site.
//! Handles:
//! - Public content API and server-rendered pages
//! - Digital twin chat
//! - Admin session login and the guarded admin CRUD API
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use folio_common::{
    auth::SessionManager,
    chat::{create_chat_model, ChatModel, Twin, TwinSettings},
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    embeddings::{create_embedder, Embedder},
    errors::AppError,
    knowledge::{ChunkingConfig, Indexer},
    metrics, Repository,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use middleware::rate_limit::{create_rate_limiter, GlobalRateLimiter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub sessions: Arc<SessionManager>,
    pub indexer: Arc<Indexer>,
    pub twin: Arc<Twin>,
    pub chat_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    /// Wire the shared services from configuration and the external clients
    pub fn build(
        config: Arc<AppConfig>,
        repo: Repository,
        embedder: Arc<dyn Embedder>,
        chat_model: Arc<dyn ChatModel>,
    ) -> Result<Self, AppError> {
        let secret = config
            .auth
            .session_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "auth.session_secret is required".to_string(),
            })?;
        let sessions = SessionManager::new(secret, config.auth.session_ttl_secs);

        let indexer = Indexer::new(
            Arc::new(repo.clone()),
            embedder.clone(),
            ChunkingConfig::from(&config.knowledge),
            config.embedding.batch_size,
        );

        let twin = Twin::new(
            Arc::new(repo.clone()),
            embedder,
            chat_model,
            TwinSettings::from_config(&config.site, &config.chat),
        )?;

        Ok(Self {
            chat_limiter: create_rate_limiter(&config.rate_limit),
            config,
            repo,
            sessions: Arc::new(sessions),
            indexer: Arc::new(indexer),
            twin: Arc::new(twin),
        })
    }

    /// Owner every public query is scoped to
    pub fn owner_id(&self) -> Uuid {
        self.config.owner_id()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    init_tracing(&config.observability);

    info!("Starting Folio Gateway v{}", folio_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    // External model clients
    let embedder = create_embedder(&config.embedding)?;
    let chat_model = create_chat_model(&config.chat)?;
    info!(
        embedding_model = embedder.model_name(),
        chat_model = chat_model.model_name(),
        owner_id = %config.owner_id(),
        "Model clients ready"
    );

    // Create app state
    let state = AppState::build(config.clone(), Repository::new(db), embedder, chat_model)?;

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},folio_common={}", config.log_level, config.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_http_request_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_chat_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::CHAT_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    // CORS is only opened up for an explicitly configured origin
    let cors = match server
        .cors_origin
        .as_deref()
        .and_then(|origin| HeaderValue::from_str(origin).ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new(),
    };

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let chat_routes = Router::new()
        .route("/api/chat", post(handlers::chat::chat))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::chat_rate_limit,
        ));

    let admin_routes = Router::new()
        .route(
            "/articles",
            get(handlers::admin::articles::list).post(handlers::admin::articles::create),
        )
        .route(
            "/articles/{id}",
            get(handlers::admin::articles::show)
                .put(handlers::admin::articles::update)
                .delete(handlers::admin::articles::remove),
        )
        .route(
            "/projects",
            get(handlers::admin::projects::list).post(handlers::admin::projects::create),
        )
        .route(
            "/projects/{id}",
            get(handlers::admin::projects::show)
                .put(handlers::admin::projects::update)
                .delete(handlers::admin::projects::remove),
        )
        .route(
            "/skills",
            get(handlers::admin::skills::list).post(handlers::admin::skills::create),
        )
        .route(
            "/skills/{id}",
            get(handlers::admin::skills::show)
                .put(handlers::admin::skills::update)
                .delete(handlers::admin::skills::remove),
        )
        .route(
            "/stories",
            get(handlers::admin::stories::list).post(handlers::admin::stories::create),
        )
        .route(
            "/stories/{id}",
            get(handlers::admin::stories::show)
                .put(handlers::admin::stories::update)
                .delete(handlers::admin::stories::remove),
        )
        .route(
            "/experiences",
            get(handlers::admin::experiences::list).post(handlers::admin::experiences::create),
        )
        .route(
            "/experiences/{id}",
            get(handlers::admin::experiences::show)
                .put(handlers::admin::experiences::update)
                .delete(handlers::admin::experiences::remove),
        )
        .route(
            "/knowledge",
            get(handlers::admin::knowledge::list).post(handlers::admin::knowledge::create),
        )
        .route("/knowledge/reindex", post(handlers::admin::knowledge::reindex))
        .route(
            "/knowledge/{id}",
            get(handlers::admin::knowledge::show)
                .put(handlers::admin::knowledge::update)
                .delete(handlers::admin::knowledge::remove),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::admin_guard::require_admin,
        ));

    let routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Pages
        .route("/", get(handlers::pages::home))
        .route("/projects", get(handlers::pages::projects))
        .route("/articles", get(handlers::pages::articles))
        .route("/articles/{slug}", get(handlers::pages::article))

        // Public API
        .route("/api/projects", get(handlers::public::list_projects))
        .route("/api/projects/{slug}", get(handlers::public::get_project))
        .route("/api/articles", get(handlers::public::list_articles))
        .route("/api/articles/{slug}", get(handlers::public::get_article))
        .route("/api/skills", get(handlers::public::list_skills))
        .route("/api/experiences", get(handlers::public::list_experiences))
        .route("/api/stories", get(handlers::public::list_stories))
        .route("/api/stories/{slug}", get(handlers::public::get_story))

        // Admin session
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/session", get(handlers::auth::session))

        .merge(chat_routes)
        .nest("/api/admin", admin_routes)
        .route_layer(from_fn(middleware::metrics::track_requests));

    // Compose the app
    routes
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use async_trait::async_trait;
    use folio_common::{
        chat::MockChatModel,
        db::{
            models::{Article, Skill, SourceKind},
            NewChunk,
        },
        embeddings::MockEmbedder,
        errors::Result as AppResult,
        knowledge::{KnowledgeStore, SourceDocument},
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Mutex;
    use tower::ServiceExt;

    const OWNER: &str = "6f1c7d3e-2b4a-4c59-9a43-0d7e5b1f2a10";

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.site.owner_id = OWNER.parse().unwrap();
        config.auth.session_secret = Some("test_secret".into());
        config.rate_limit.enabled = false;
        config
    }

    fn test_state(db: MockDatabase) -> AppState {
        let repo = Repository::new(DbPool::from_connection(db.into_connection()));
        AppState::build(
            Arc::new(test_config()),
            repo,
            Arc::new(MockEmbedder::new(8)),
            Arc::new(MockChatModel),
        )
        .unwrap()
    }

    fn empty_db() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    /// Records index writes instead of touching the database
    #[derive(Default)]
    struct RecordingStore {
        deletes: Mutex<Vec<(SourceKind, Option<Uuid>)>>,
        inserted: Mutex<Vec<NewChunk>>,
        fail: bool,
    }

    #[async_trait]
    impl KnowledgeStore for RecordingStore {
        async fn delete_source(
            &self,
            _owner_id: Uuid,
            kind: SourceKind,
            source_id: Option<Uuid>,
        ) -> AppResult<u64> {
            if self.fail {
                return Err(AppError::Internal { message: "index offline".into() });
            }
            self.deletes.lock().unwrap().push((kind, source_id));
            Ok(1)
        }

        async fn clear_kind(&self, _owner_id: Uuid, _kind: SourceKind) -> AppResult<u64> {
            Ok(0)
        }

        async fn prune_kind(
            &self,
            _owner_id: Uuid,
            _kind: SourceKind,
            _keep: &[Uuid],
        ) -> AppResult<u64> {
            Ok(0)
        }

        async fn insert_chunk(&self, chunk: NewChunk) -> AppResult<Uuid> {
            self.inserted.lock().unwrap().push(chunk);
            Ok(Uuid::new_v4())
        }

        async fn published_documents(&self, _owner_id: Uuid) -> AppResult<Vec<SourceDocument>> {
            Ok(Vec::new())
        }
    }

    fn with_store(mut state: AppState, store: Arc<RecordingStore>) -> AppState {
        state.indexer = Arc::new(Indexer::new(
            store,
            Arc::new(MockEmbedder::new(8)),
            ChunkingConfig::from(&state.config.knowledge),
            state.config.embedding.batch_size,
        ));
        state
    }

    fn article(id: Uuid, status: &str) -> Article {
        let now = chrono::Utc::now();
        Article {
            id,
            owner_id: OWNER.parse().unwrap(),
            slug: "hello".into(),
            title: "Hello".into(),
            excerpt: String::new(),
            body: "I write about distributed systems and the tools I build for them.".into(),
            tags: serde_json::json!([]),
            status: status.into(),
            published_at: Some(now.into()),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn admin_request(state: &AppState, method: Method, uri: String, body: Body) -> Request<Body> {
        let issued = state.sessions.issue(state.owner_id()).unwrap();
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::COOKIE,
                format!("session={}; csrf={}", issued.token, issued.csrf_token),
            )
            .header("x-csrf-token", &issued.csrf_token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_state_requires_session_secret() {
        let mut config = test_config();
        config.auth.session_secret = None;
        let repo = Repository::new(DbPool::from_connection(empty_db().into_connection()));

        let result = AppState::build(
            Arc::new(config),
            repo,
            Arc::new(MockEmbedder::new(8)),
            Arc::new(MockChatModel),
        );
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state(empty_db()));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_admin_requires_session() {
        let app = create_router(test_state(empty_db()));

        let response = app
            .oneshot(Request::get("/api/admin/skills").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_admin_rejects_tampered_session() {
        let state = test_state(empty_db());
        let issued = state.sessions.issue(state.owner_id()).unwrap();
        let tampered = format!("{}x", issued.token);
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::get("/api/admin/skills")
                    .header(header::COOKIE, format!("session={}", tampered))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_rejects_other_owner() {
        let state = test_state(empty_db());
        let issued = state.sessions.issue(Uuid::new_v4()).unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::get("/api/admin/skills")
                    .header(header::COOKIE, format!("session={}", issued.token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_read_with_session() {
        let state = test_state(empty_db().append_query_results([Vec::<Skill>::new()]));
        let issued = state.sessions.issue(state.owner_id()).unwrap();
        let app = create_router(state);

        // Reads do not need the CSRF header
        let response = app
            .oneshot(
                Request::get("/api/admin/skills")
                    .header(header::COOKIE, format!("session={}", issued.token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_admin_write_requires_matching_csrf() {
        let state = test_state(empty_db());
        let issued = state.sessions.issue(state.owner_id()).unwrap();
        let app = create_router(state);

        let cookies = format!("session={}; csrf={}", issued.token, issued.csrf_token);
        let body = r#"{"name":"Rust","level":5}"#;

        let missing = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/admin/skills")
                    .header(header::COOKIE, &cookies)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::FORBIDDEN);

        let mismatched = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/api/admin/skills/{}", Uuid::new_v4()))
                    .header(header::COOKIE, &cookies)
                    .header("x-csrf-token", "0".repeat(64))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(mismatched.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(mismatched).await["error"]["code"], "CSRF_MISMATCH");
    }

    #[tokio::test]
    async fn test_login_unconfigured() {
        let app = create_router(test_state(empty_db()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"password":"hunter2"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_session_status_without_cookie() {
        let app = create_router(test_state(empty_db()));

        let response = app
            .oneshot(Request::get("/api/auth/session").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({ "authenticated": false }));
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_message() {
        let app = create_router(test_state(empty_db()));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unpublishing_drops_chunks() {
        let id = Uuid::new_v4();
        let store = Arc::new(RecordingStore::default());
        let state = with_store(
            test_state(
                empty_db()
                    .append_query_results([vec![article(id, "published")]])
                    .append_query_results([vec![article(id, "draft")]]),
            ),
            store.clone(),
        );
        let request = admin_request(
            &state,
            Method::PUT,
            format!("/api/admin/articles/{}", id),
            Body::from(r#"{"title":"Hello","body":"Draft again","status":"draft"}"#),
        );

        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*store.deletes.lock().unwrap(), vec![(SourceKind::Article, Some(id))]);
        assert!(store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_published_update_replaces_chunks() {
        let id = Uuid::new_v4();
        let store = Arc::new(RecordingStore::default());
        let state = with_store(
            test_state(
                empty_db()
                    .append_query_results([vec![article(id, "published")]])
                    .append_query_results([vec![article(id, "published")]]),
            ),
            store.clone(),
        );
        let request = admin_request(
            &state,
            Method::PUT,
            format!("/api/admin/articles/{}", id),
            Body::from(r#"{"title":"Hello","body":"New body","status":"published"}"#),
        );

        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["index"]["sources"], 1);
        assert_eq!(*store.deletes.lock().unwrap(), vec![(SourceKind::Article, Some(id))]);
        let inserted = store.inserted.lock().unwrap();
        assert!(!inserted.is_empty());
        assert!(inserted.iter().all(|c| c.source_id == Some(id) && c.source_type == SourceKind::Article));
    }

    #[tokio::test]
    async fn test_delete_drops_chunks() {
        let id = Uuid::new_v4();
        let store = Arc::new(RecordingStore::default());
        let state = with_store(
            test_state(
                empty_db().append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }]),
            ),
            store.clone(),
        );
        let request = admin_request(
            &state,
            Method::DELETE,
            format!("/api/admin/articles/{}", id),
            Body::empty(),
        );

        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(*store.deletes.lock().unwrap(), vec![(SourceKind::Article, Some(id))]);
    }

    #[tokio::test]
    async fn test_index_failure_does_not_fail_write() {
        let id = Uuid::new_v4();
        let store = Arc::new(RecordingStore { fail: true, ..Default::default() });
        let state = with_store(
            test_state(
                empty_db()
                    .append_query_results([vec![article(id, "published")]])
                    .append_query_results([vec![article(id, "published")]]),
            ),
            store,
        );
        let request = admin_request(
            &state,
            Method::PUT,
            format!("/api/admin/articles/{}", id),
            Body::from(r#"{"title":"Hello","body":"New body","status":"published"}"#),
        );

        let response = create_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["id"], id.to_string());
        assert!(body.get("index").is_none());
    }

    #[tokio::test]
    async fn test_ready_hides_database_error() {
        let app = create_router(test_state(empty_db()));

        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["checks"]["database"]["error"], "database unreachable");
    }
}

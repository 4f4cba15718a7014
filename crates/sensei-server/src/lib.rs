//! UPISensei Web Server
//!
//! Axum-based REST API for the UPISensei statement assistant.
//!
//! - `POST /api/upload`: PDF/CSV statement upload, extraction, storage
//! - `POST /api/chat`: questions about the stored transactions
//! - Read endpoints for transactions, files and spending stats
//!
//! There is no authentication; every request acts as the single demo user.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use sensei_core::{
    ChatBackend, ChatOrchestrator, FileProcessor, LlmClient, OcrSpaceClient, SenseiConfig,
    TransactionStore,
};

mod handlers;

/// Request body cap: the largest statement (7 MB PDF) plus multipart overhead
pub const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub store: TransactionStore,
    pub processor: FileProcessor,
    /// None when no LLM backend is configured
    pub chat: Option<ChatOrchestrator>,
    pub config: ServerConfig,
}

impl AppState {
    /// Build state from resolved configuration
    ///
    /// Uses the OCR.space client for PDFs and whichever LLM backend the
    /// config selects. The store starts empty unless `seed_demo` is set.
    pub async fn from_config(config: &SenseiConfig, seed_demo: bool) -> anyhow::Result<Self> {
        let ocr = OcrSpaceClient::new(config.ocr.clone());
        let processor = FileProcessor::new(Arc::new(ocr))?;

        let chat = LlmClient::from_config(&config.llm).map(ChatOrchestrator::new);
        match chat {
            Some(ref chat) => info!(
                "LLM backend configured: {} ({} at {})",
                chat.client().backend_name(),
                chat.client().model(),
                chat.client().host()
            ),
            None => warn!(
                backend = %config.llm.backend,
                "LLM backend not configured (set GEMINI_API_KEY to enable chat)"
            ),
        }

        let store = if seed_demo {
            TransactionStore::with_demo_seed(Local::now().date_naive()).await
        } else {
            TransactionStore::new()
        };

        Ok(Self {
            store,
            processor,
            chat,
            config: ServerConfig::default(),
        })
    }
}

/// Create the application router
pub fn create_router(state: AppState, static_dir: Option<&str>) -> Router {
    let cors = build_cors(&state.config);
    let state = Arc::new(state);

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Statements
        .route("/upload", post(handlers::upload))
        .route("/files", get(handlers::list_files))
        .route("/files/:id", get(handlers::get_file))
        // Transactions and stats
        .route("/transactions", get(handlers::list_transactions))
        .route("/stats/summary", get(handlers::stats_summary))
        .route("/stats/trends", get(handlers::stats_trends))
        .route("/stats/categories", get(handlers::stats_categories))
        .route("/stats/insights", get(handlers::stats_insights))
        // Chat agent
        .route("/chat", post(handlers::chat))
        .route("/analyze", post(handlers::analyze));

    // CSP: restrict scripts to same-origin, allow inline styles, allow blob: for images
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve the web UI if a directory is provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

fn build_cors(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if config.allowed_origins.is_empty() {
        return cors;
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    cors.allow_origin(origins)
}

/// Start the server
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(ref chat) = state.chat {
        check_llm_connection(chat.client()).await;
    }

    let app = create_router(state, static_dir);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log LLM backend connection status
async fn check_llm_connection(client: &LlmClient) {
    if client.health_check().await {
        info!(
            "✅ LLM backend connected: {} ({})",
            client.host(),
            client.model()
        );
    } else {
        warn!(
            "⚠️  LLM backend configured but not responding: {} ({})",
            client.host(),
            client.model()
        );
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
///
/// Serializes as `{"error", "details"?, "suggestion"?}`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<String>,
    suggestion: Option<String>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            details: None,
            suggestion: None,
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn too_many_requests(msg: &str) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, msg)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let mut body = serde_json::json!({
            "error": self.message
        });
        if let Some(details) = self.details {
            body["details"] = details.into();
        }
        if let Some(suggestion) = self.suggestion {
            body["suggestion"] = suggestion.into();
        }

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            details: None,
            suggestion: None,
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

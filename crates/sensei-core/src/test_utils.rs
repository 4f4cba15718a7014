//! Test utilities for sensei-core
//!
//! Mock OCR.space and Gemini HTTP servers bound to an ephemeral local port,
//! for integration tests and offline development.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Form, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Start `app` on 127.0.0.1:0 and return its address plus a shutdown handle
async fn spawn(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

// ========== OCR.space ==========

/// How the mock OCR server answers a given credential
#[derive(Debug, Clone)]
pub enum OcrReply {
    /// Success with one ParsedResult per entry
    Pages(Vec<String>),
    /// `IsErroredOnProcessing` with this message
    Errored(String),
    /// Bare HTTP status, no body
    Status(u16),
    /// Hold the request this long, then answer with no pages
    Stall(Duration),
}

#[derive(Clone)]
struct OcrState {
    replies: Arc<HashMap<String, OcrReply>>,
    default_reply: OcrReply,
    seen_keys: Arc<Mutex<Vec<String>>>,
}

/// Mock OCR.space `parse/image` endpoint
pub struct MockOcrServer {
    addr: SocketAddr,
    seen_keys: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOcrServer {
    /// Every credential gets `Pages(pages)`
    pub async fn start(pages: Vec<&str>) -> Self {
        let reply = OcrReply::Pages(pages.into_iter().map(String::from).collect());
        Self::start_with(HashMap::new(), reply).await
    }

    /// Per-credential replies; other credentials get `default_reply`
    pub async fn start_with(replies: HashMap<String, OcrReply>, default_reply: OcrReply) -> Self {
        let seen_keys = Arc::new(Mutex::new(Vec::new()));
        let state = OcrState {
            replies: Arc::new(replies),
            default_reply,
            seen_keys: seen_keys.clone(),
        };
        let app = Router::new()
            .route("/parse/image", post(handle_ocr))
            .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
            .with_state(state);

        let (addr, shutdown_tx) = spawn(app).await;
        Self {
            addr,
            seen_keys,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Full endpoint URL for `OcrConfig::endpoint`
    pub fn endpoint(&self) -> String {
        format!("http://{}/parse/image", self.addr)
    }

    /// Credentials received so far, in request order
    pub fn seen_keys(&self) -> Vec<String> {
        self.seen_keys.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOcrServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct OcrForm {
    apikey: String,
    #[serde(rename = "base64Image")]
    base64_image: String,
}

async fn handle_ocr(State(state): State<OcrState>, Form(form): Form<OcrForm>) -> Response {
    state.seen_keys.lock().unwrap().push(form.apikey.clone());

    if !form.base64_image.starts_with("data:application/pdf;base64,") {
        return (StatusCode::BAD_REQUEST, "expected a PDF data URI").into_response();
    }

    let reply = state
        .replies
        .get(&form.apikey)
        .unwrap_or(&state.default_reply)
        .clone();

    match reply {
        OcrReply::Pages(pages) => Json(json!({
            "IsErroredOnProcessing": false,
            "ParsedResults": pages
                .iter()
                .map(|text| json!({ "ParsedText": text }))
                .collect::<Vec<_>>(),
        }))
        .into_response(),
        OcrReply::Errored(message) => Json(json!({
            "IsErroredOnProcessing": true,
            "ErrorMessage": [message],
        }))
        .into_response(),
        OcrReply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        OcrReply::Stall(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "IsErroredOnProcessing": false, "ParsedResults": [] })).into_response()
        }
    }
}

// ========== Gemini ==========

/// API key the mock Gemini server answers with HTTP 429
pub const GEMINI_QUOTA_KEY: &str = "quota-exhausted";
/// API key the mock Gemini server rejects as invalid
pub const GEMINI_BAD_KEY: &str = "bad-key";

/// Mock Gemini `generateContent` API
pub struct MockGeminiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    pub async fn start() -> Self {
        let app = Router::new().route(
            "/v1beta/models/:model_action",
            get(handle_gemini_model).post(handle_gemini_generate),
        );
        let (addr, shutdown_tx) = spawn(app).await;
        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for `LlmConfig::gemini_base_url`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Error response for the special keys, None for a usable key
fn gemini_key_error(headers: &HeaderMap) -> Option<Response> {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let (status, body) = match key {
        "" => (
            StatusCode::FORBIDDEN,
            json!({"error": {"code": 403, "message": "Method doesn't allow unregistered callers.", "status": "PERMISSION_DENIED"}}),
        ),
        GEMINI_QUOTA_KEY => (
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"code": 429, "message": "You exceeded your current quota.", "status": "RESOURCE_EXHAUSTED"}}),
        ),
        GEMINI_BAD_KEY => (
            StatusCode::BAD_REQUEST,
            json!({"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}),
        ),
        _ => return None,
    };
    Some((status, Json(body)).into_response())
}

async fn handle_gemini_model(Path(model): Path<String>, headers: HeaderMap) -> Response {
    if let Some(err) = gemini_key_error(&headers) {
        return err;
    }
    Json(json!({ "name": format!("models/{}", model) })).into_response()
}

async fn handle_gemini_generate(
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(request): Json<serde_json::Value>,
) -> Response {
    if !model_action.ends_with(":generateContent") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if let Some(err) = gemini_key_error(&headers) {
        return err;
    }

    let prompt = request["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    let message = prompt
        .rsplit_once("USER MESSAGE:")
        .and_then(|(_, rest)| rest.lines().next())
        .map(str::trim)
        .unwrap_or("analysis");

    Json(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": "Gemini mock: " }, { "text": message }]
            },
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}

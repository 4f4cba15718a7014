//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use sensei_core::models::DEMO_USER;
use sensei_core::ChatBackend;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmStatus {
    pub backend: &'static str,
    pub model: String,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// None when no LLM backend is configured
    pub llm: Option<LlmStatus>,
    pub transaction_count: usize,
}

/// GET /api/health - Liveness plus LLM reachability
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let llm = match state.chat {
        Some(ref chat) => {
            let client = chat.client();
            Some(LlmStatus {
                backend: client.backend_name(),
                model: client.model().to_string(),
                connected: client.health_check().await,
            })
        }
        None => None,
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        llm,
        transaction_count: state.store.transactions_for(DEMO_USER).await.len(),
    })
}

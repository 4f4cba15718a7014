//! Chat agent handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{AppError, AppState};
use sensei_core::chat::{uploaded_files_context, ChatOrchestrator};
use sensei_core::models::DEMO_USER;
use sensei_core::Error as CoreError;

/// Request body for chat endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// Uploaded files the question refers to
    #[serde(default)]
    pub file_ids: Vec<String>,
}

/// Assistant message returned by the chat endpoint
#[derive(Debug, Serialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub content: String,
    pub timestamp: String,
}

/// Request body for analyze endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Restrict the analysis to these files' transactions
    #[serde(default)]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub content: String,
    pub transaction_count: usize,
}

/// Translate an LLM failure into the chat API's error contract
fn chat_error(err: CoreError) -> AppError {
    let details = err.to_string();
    match err {
        CoreError::QuotaExceeded(_) => AppError::too_many_requests("API quota exceeded"),
        CoreError::LlmAuth(_) => AppError::internal("Gemini API configuration error"),
        _ => AppError::internal("Failed to process message"),
    }
    .with_details(details)
}

fn orchestrator(state: &AppState) -> Result<&ChatOrchestrator, AppError> {
    state.chat.as_ref().ok_or_else(|| {
        AppError::internal("Gemini API configuration error")
            .with_details("No LLM backend configured (set GEMINI_API_KEY)")
    })
}

/// POST /api/chat - Ask the agent about the current user's transactions
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatMessage>, AppError> {
    let Json(request) = payload.map_err(|e| {
        AppError::bad_request("Valid message is required").with_details(e.body_text())
    })?;
    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Valid message is required"))?;

    let chat = orchestrator(&state)?;
    let transactions = state.store.transactions_for(DEMO_USER).await;

    let file_context = if request.file_ids.is_empty() {
        None
    } else {
        let files = state
            .store
            .files_by_ids(DEMO_USER, &request.file_ids)
            .await;
        debug!(requested = request.file_ids.len(), found = files.len(), "Chat file context");
        (!files.is_empty()).then(|| uploaded_files_context(files.len()))
    };

    let content = chat
        .reply(&message, &transactions, file_context.as_deref())
        .await
        .map_err(chat_error)?;

    let now = Utc::now();
    info!(
        transactions = transactions.len(),
        reply_chars = content.len(),
        "Chat reply"
    );

    Ok(Json(ChatMessage {
        id: now.timestamp_millis().to_string(),
        message_type: "assistant",
        content,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// POST /api/analyze - Comprehensive analysis of the user's transactions
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<AnalyzeRequest>>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let chat = orchestrator(&state)?;

    let transactions = if request.file_ids.is_empty() {
        state.store.transactions_for(DEMO_USER).await
    } else {
        state
            .store
            .files_by_ids(DEMO_USER, &request.file_ids)
            .await
            .into_iter()
            .flat_map(|f| f.transactions)
            .collect()
    };

    let content = chat.analyze(&transactions).await;
    Ok(Json(AnalyzeResponse {
        content,
        transaction_count: transactions.len(),
    }))
}

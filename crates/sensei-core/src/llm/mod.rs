//! Pluggable LLM backend abstraction for the chat agent
//!
//! # Architecture
//!
//! - `ChatBackend` trait: one-shot text generation with a system instruction
//! - `LlmClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables (see [`crate::config::LlmConfig`]):
//! - `LLM_BACKEND`: Backend to use (gemini, openai_compatible, mock). Default: gemini
//! - `GEMINI_API_KEY`: API key (required for gemini backend)
//! - `GEMINI_MODEL`: Model name (default: gemini-2.5-flash)
//! - `GEMINI_BASE_URL`: API base URL (default: https://generativelanguage.googleapis.com)
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-4o-mini)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

mod gemini;
mod mock;
mod openai_compatible;

pub use gemini::{GeminiBackend, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use mock::{MockBackend, MockFailure};
pub use openai_compatible::OpenAICompatibleBackend;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Trait implemented by every text-generation backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate a reply to `prompt` under the given system instruction
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;

    /// Check if the backend is reachable and accepts our credentials
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete LLM client enum
#[derive(Clone)]
pub enum LlmClient {
    /// Google Gemini `generateContent` API
    Gemini(GeminiBackend),
    /// Any OpenAI chat-completions server (vLLM, LocalAI, llama-server, ...)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Canned replies for tests and offline development
    Mock(MockBackend),
}

impl LlmClient {
    /// Build the configured backend
    ///
    /// Returns None if the selected backend is missing required settings
    /// (API key for Gemini, host for OpenAI-compatible).
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        match config.backend.to_lowercase().as_str() {
            "gemini" | "google" => GeminiBackend::from_config(config).map(LlmClient::Gemini),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_config(config).map(LlmClient::OpenAICompatible)
            }
            "mock" => Some(LlmClient::Mock(MockBackend::new())),
            other => {
                tracing::warn!(backend = %other, "Unknown LLM_BACKEND, falling back to gemini");
                GeminiBackend::from_config(config).map(LlmClient::Gemini)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        LlmClient::Mock(MockBackend::new())
    }

    /// Human-readable backend name
    pub fn backend_name(&self) -> &'static str {
        match self {
            LlmClient::Gemini(_) => "gemini",
            LlmClient::OpenAICompatible(_) => "openai_compatible",
            LlmClient::Mock(_) => "mock",
        }
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        match self {
            LlmClient::Gemini(b) => b.generate(system, prompt).await,
            LlmClient::OpenAICompatible(b) => b.generate(system, prompt).await,
            LlmClient::Mock(b) => b.generate(system, prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            LlmClient::Gemini(b) => b.health_check().await,
            LlmClient::OpenAICompatible(b) => b.health_check().await,
            LlmClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            LlmClient::Gemini(b) => b.model(),
            LlmClient::OpenAICompatible(b) => b.model(),
            LlmClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            LlmClient::Gemini(b) => b.host(),
            LlmClient::OpenAICompatible(b) => b.host(),
            LlmClient::Mock(b) => b.host(),
        }
    }
}

/// Map an unsuccessful upstream response onto our error taxonomy
///
/// Quota exhaustion and credential problems get their own variants so the
/// API layer can answer 429 and a configuration error respectively.
pub(crate) fn classify_api_error(provider: &str, status: StatusCode, body: &str) -> Error {
    let lower = body.to_lowercase();
    if status == StatusCode::TOO_MANY_REQUESTS
        || lower.contains("quota")
        || lower.contains("resource_exhausted")
    {
        return Error::QuotaExceeded(format!("{} API quota exceeded ({})", provider, status));
    }
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || lower.contains("api key")
        || lower.contains("api_key_invalid")
    {
        return Error::LlmAuth(format!("{} API key rejected ({})", provider, status));
    }
    Error::Llm(format!("{} API error {}: {}", provider, status, body))
}

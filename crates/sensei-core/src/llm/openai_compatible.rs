//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API:
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp (http://localhost:8080)
//! - OpenAI itself (https://api.openai.com)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{classify_api_error, ChatBackend};
use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// OpenAI-compatible backend
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Build from config; None without a host
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        let host = config.openai_host.as_deref().filter(|h| !h.is_empty())?;
        let mut backend = Self::new(host, &config.openai_model);
        backend.api_key = config.openai_api_key.clone().filter(|k| !k.is_empty());
        backend.timeout = Duration::from_secs(config.request_timeout_secs);
        Some(backend)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref api_key) => builder.header("Authorization", format!("Bearer {}", api_key)),
            None => builder,
        }
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatBackend for OpenAICompatibleBackend {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: Some(0.7),
            stream: false,
        };

        let req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(self.timeout)
            .json(&request);

        let response = self.authorize(req_builder).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error("OpenAI-compatible", status, &body));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;
        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Llm("No response from OpenAI-compatible API".into()))?;

        debug!(model = %self.model, chars = text.len(), "OpenAI-compatible response");
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        // Try /v1/models first (standard OpenAI endpoint)
        let models = self.authorize(
            self.http_client
                .get(format!("{}/v1/models", self.base_url))
                .timeout(Duration::from_secs(10)),
        );
        if let Ok(resp) = models.send().await {
            if resp.status().is_success() {
                return true;
            }
        }

        // Try /health (common for LocalAI, llama-server)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            return resp.status().is_success();
        }

        false
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let backend = OpenAICompatibleBackend::new("http://localhost:8000/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:8000");
        assert_eq!(backend.model(), "llama3.2");
        assert!(backend.api_key.is_none());
    }

    #[test]
    fn test_with_api_key() {
        let backend =
            OpenAICompatibleBackend::with_api_key("http://localhost:8000", "gpt-4o-mini", "sk-test");
        assert_eq!(backend.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_from_config_requires_host() {
        let config = LlmConfig::default();
        assert!(OpenAICompatibleBackend::from_config(&config).is_none());

        let config = LlmConfig {
            openai_host: Some("http://localhost:8080".to_string()),
            ..LlmConfig::default()
        };
        assert!(OpenAICompatibleBackend::from_config(&config).is_some());
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let backend = OpenAICompatibleBackend::new("http://localhost:99999", "llama3.2");
        assert!(!backend.health_check().await);
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "llama3.2".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            temperature: Some(0.7),
            stream: false,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"llama3.2\""));
        assert!(json.contains("\"stream\":false"));
    }
}

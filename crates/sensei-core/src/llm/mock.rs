//! Mock backend for testing
//!
//! Replies without any network access. Can be told to fail in the ways the
//! real backends fail so callers' error paths can be exercised.

use async_trait::async_trait;

use super::ChatBackend;
use crate::error::{Error, Result};

/// How a failing mock should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Quota,
    Auth,
    Upstream,
}

/// Mock LLM backend for testing
#[derive(Clone, Debug, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Fixed reply; when None the reply echoes the user's message
    pub reply: Option<String>,
    pub failure: Option<MockFailure>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    /// Always answer with `reply`
    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::new()
        }
    }

    /// Always fail with the given kind of error
    pub fn failing(failure: MockFailure) -> Self {
        Self {
            healthy: false,
            failure: Some(failure),
            ..Self::default()
        }
    }
}

/// The text after the last `USER MESSAGE:` marker, if any
fn user_message(prompt: &str) -> Option<&str> {
    let (_, rest) = prompt.rsplit_once("USER MESSAGE:")?;
    rest.lines().next().map(str::trim).filter(|m| !m.is_empty())
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn generate(&self, _system: &str, prompt: &str) -> Result<String> {
        match self.failure {
            Some(MockFailure::Quota) => {
                return Err(Error::QuotaExceeded("mock quota exhausted".into()))
            }
            Some(MockFailure::Auth) => return Err(Error::LlmAuth("mock API key rejected".into())),
            Some(MockFailure::Upstream) => return Err(Error::Llm("mock upstream failure".into())),
            None => {}
        }

        if let Some(ref reply) = self.reply {
            return Ok(reply.clone());
        }

        Ok(match user_message(prompt) {
            Some(message) => format!("UPISensei (mock) received: {}", message),
            None => "UPISensei (mock) analysis: your spending looks healthy.".to_string(),
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

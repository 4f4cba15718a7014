//! OCR client for scanned/image PDF statements (OCR.space API)
//!
//! The service caps request size, so large PDFs are split into byte chunks
//! and sent one after another. Each chunk walks the ordered credential list
//! until one succeeds; a chunk that fails with every credential fails the
//! whole document.
//!
//! Page numbers are estimated from size (~200 KiB per page) and only used to
//! annotate the output with `--- Page N ---` markers.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Public demo key accepted by OCR.space
pub const DEMO_CREDENTIAL: &str = "helloworld";

/// Anything that can turn PDF bytes into text
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn extract_text(&self, pdf: &[u8], filename: &str) -> Result<String>;
}

/// How each chunk is retried across credentials
#[derive(Debug, Clone)]
pub struct OcrRetryPolicy {
    /// Tried in order for every chunk
    pub credentials: Vec<String>,
    /// Wait after a rate-limited attempt
    pub rate_limit_backoff: Duration,
    /// Wait after any other failed attempt
    pub error_backoff: Duration,
    /// Pause between consecutive chunks
    pub inter_chunk_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for OcrRetryPolicy {
    fn default() -> Self {
        Self {
            credentials: vec![DEMO_CREDENTIAL.to_string()],
            rate_limit_backoff: Duration::from_secs(3),
            error_backoff: Duration::from_secs(1),
            inter_chunk_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl OcrRetryPolicy {
    /// Same credentials with every wait set to zero (tests, local mocks)
    pub fn without_delays(mut self) -> Self {
        self.rate_limit_backoff = Duration::ZERO;
        self.error_backoff = Duration::ZERO;
        self.inter_chunk_delay = Duration::ZERO;
        self
    }
}

/// OCR endpoint, request shaping and chunking thresholds
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub endpoint: String,
    pub language: String,
    pub engine: u8,
    /// Largest body sent in a single request
    pub max_request_bytes: usize,
    /// Fraction of `max_request_bytes` used per chunk when splitting
    pub chunk_ratio: f64,
    /// Size heuristic for page annotation
    pub bytes_per_page: usize,
    pub retry: OcrRetryPolicy,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            language: "eng".to_string(),
            engine: 1,
            max_request_bytes: 1024 * 1024,
            chunk_ratio: 0.8,
            bytes_per_page: 200 * 1024,
            retry: OcrRetryPolicy::default(),
        }
    }
}

/// A slice of the PDF sent as one OCR request
#[derive(Debug, Clone, PartialEq)]
pub struct PdfChunk<'a> {
    pub bytes: &'a [u8],
    /// Estimated pages covered; may be empty
    pub pages: Vec<usize>,
}

/// Split a PDF buffer into request-sized chunks with estimated page ranges
pub fn split_into_chunks<'a>(data: &'a [u8], config: &OcrConfig) -> Vec<PdfChunk<'a>> {
    if data.len() <= config.max_request_bytes {
        return vec![PdfChunk {
            bytes: data,
            pages: vec![1],
        }];
    }

    let chunk_size = ((config.max_request_bytes as f64 * config.chunk_ratio).floor() as usize).max(1);
    let num_chunks = data.len().div_ceil(chunk_size);
    let estimated_pages = data.len().div_ceil(config.bytes_per_page.max(1));

    data.chunks(chunk_size)
        .enumerate()
        .map(|(i, bytes)| {
            let start_page = i * estimated_pages / num_chunks + 1;
            let end_page = (i + 1) * estimated_pages / num_chunks;
            PdfChunk {
                bytes,
                pages: (start_page..=end_page).collect(),
            }
        })
        .collect()
}

fn page_list(pages: &[usize]) -> String {
    pages
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Why a single OCR request failed
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error("OCR API responded with status: {0}")]
    Status(StatusCode),

    #[error("File size exceeds the maximum size limit: {0}")]
    SizeLimit(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Service(String),

    #[error("OCR request timeout")]
    Timeout,

    #[error("OCR request failed: {0}")]
    Transport(String),
}

impl AttemptError {
    fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::Status(status) => {
                *status == StatusCode::FORBIDDEN || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Classify an `ErrorMessage` from a response flagged as errored
    fn from_service_message(message: String) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("size") || lower.contains("large") {
            Self::SizeLimit(message)
        } else if lower.contains("rate") || lower.contains("limit") {
            Self::RateLimited(message)
        } else {
            Self::Service(message)
        }
    }
}

/// OCR.space `ErrorMessage` arrives as either a string or a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn first(self) -> Option<String> {
        match self {
            Self::One(s) => Some(s),
            Self::Many(v) => v.into_iter().next(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrResponse {
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<ErrorMessage>,
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
}

/// HTTP client for the OCR.space parse endpoint
#[derive(Clone)]
pub struct OcrSpaceClient {
    http_client: Client,
    config: OcrConfig,
}

impl OcrSpaceClient {
    pub fn new(config: OcrConfig) -> Self {
        Self {
            http_client: Client::new(),
            config,
        }
    }

    /// OCR a whole document, chunk by chunk
    pub async fn extract(&self, pdf: &[u8], filename: &str) -> Result<String> {
        let policy = &self.config.retry;
        if policy.credentials.is_empty() {
            return Err(Error::NoOcrCredentials);
        }

        let chunks = split_into_chunks(pdf, &self.config);
        info!(
            filename = %filename,
            size_kb = pdf.len() / 1024,
            chunks = chunks.len(),
            "Running OCR"
        );

        let mut texts = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 && !policy.inter_chunk_delay.is_zero() {
                tokio::time::sleep(policy.inter_chunk_delay).await;
            }
            debug!(
                chunk = i + 1,
                of = chunks.len(),
                size_kb = chunk.bytes.len() / 1024,
                "Processing OCR chunk"
            );
            texts.push(self.process_chunk(chunk).await?);
        }

        let text = texts.join("\n\n").trim().to_string();
        info!(filename = %filename, chars = text.len(), "OCR complete");
        Ok(text)
    }

    /// Try each credential in order; the first success wins
    async fn process_chunk(&self, chunk: &PdfChunk<'_>) -> Result<String> {
        let policy = &self.config.retry;
        let pages = page_list(&chunk.pages);
        let mut last_error = None;

        for (attempt, credential) in policy.credentials.iter().enumerate() {
            match self.send_request(chunk, credential).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(
                        key = %key_hint(credential),
                        pages = %pages,
                        error = %e,
                        "OCR attempt failed"
                    );
                    let backoff = if e.is_rate_limit() {
                        policy.rate_limit_backoff
                    } else {
                        policy.error_backoff
                    };
                    last_error = Some(e);

                    let more_to_try = attempt + 1 < policy.credentials.len();
                    if more_to_try && !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(Error::OcrFailed {
            pages,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempts made".to_string()),
        })
    }

    async fn send_request(
        &self,
        chunk: &PdfChunk<'_>,
        credential: &str,
    ) -> std::result::Result<String, AttemptError> {
        let payload = base64::engine::general_purpose::STANDARD.encode(chunk.bytes);
        let engine = self.config.engine.to_string();
        let image = format!("data:application/pdf;base64,{}", payload);
        let form = [
            ("apikey", credential),
            ("language", self.config.language.as_str()),
            ("isOverlayRequired", "false"),
            ("base64Image", image.as_str()),
            ("filetype", "PDF"),
            ("OCREngine", engine.as_str()),
            ("scale", "true"),
            ("detectOrientation", "true"),
            ("isTable", "true"),
        ];

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .form(&form)
            .timeout(self.config.retry.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptError::Timeout
                } else {
                    AttemptError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(AttemptError::Status(response.status()));
        }

        let body: OcrResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AttemptError::Timeout
            } else {
                AttemptError::Transport(e.to_string())
            }
        })?;

        if body.is_errored_on_processing {
            let message = body
                .error_message
                .and_then(ErrorMessage::first)
                .unwrap_or_else(|| "OCR processing failed".to_string());
            return Err(AttemptError::from_service_message(message));
        }

        let mut text = String::new();
        for (index, result) in body.parsed_results.unwrap_or_default().into_iter().enumerate() {
            let Some(parsed) = result.parsed_text.filter(|t| !t.is_empty()) else {
                continue;
            };
            let page = chunk.pages.get(index).copied().unwrap_or(index + 1);
            text.push_str(&format!("--- Page {} ---\n{}\n\n", page, parsed));
        }

        debug!(pages = %page_list(&chunk.pages), chars = text.len(), "OCR chunk extracted");
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl TextRecognizer for OcrSpaceClient {
    async fn extract_text(&self, pdf: &[u8], filename: &str) -> Result<String> {
        self.extract(pdf, filename).await
    }
}

/// First few characters of a credential, for logs
fn key_hint(credential: &str) -> String {
    let prefix: String = credential.chars().take(5).collect();
    format!("{}...", prefix)
}

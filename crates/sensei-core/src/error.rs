//! Error types for UPISensei

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("OCR failed for pages {pages}: {last_error}")]
    OcrFailed { pages: String, last_error: String },

    #[error("No OCR credentials configured")]
    NoOcrCredentials,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM API configuration error: {0}")]
    LlmAuth(String),

    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Extraction error: {0}")]
    Extraction(String),
}

impl Error {
    /// Whether this error came from an upstream quota/rate limit
    pub fn is_quota(&self) -> bool {
        matches!(self, Error::QuotaExceeded(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

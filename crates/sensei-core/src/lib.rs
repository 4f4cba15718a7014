//! UPISensei Core Library
//!
//! Shared functionality for the UPISensei statement assistant:
//! - Amount/date field parsing and keyword categorization
//! - OCR client for scanned PDF statements (OCR.space)
//! - Text and CSV transaction extractors
//! - File processor with demo-data fallback
//! - In-memory transaction store
//! - Chat orchestration over pluggable LLM backends (Gemini, OpenAI-compatible)
//! - Spending summaries and trends
//! - Layered configuration (embedded defaults, override file, environment)

pub mod categorize;
pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod fields;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod processor;
pub mod stats;
pub mod store;

/// Test utilities including mock OCR and Gemini servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use categorize::{bank_from_filename, categorize, extract_merchant};
pub use chat::ChatOrchestrator;
pub use config::{LlmConfig, SenseiConfig, ServerSettings};
pub use error::{Error, Result};
pub use extract::{CsvExtractor, TextExtractor};
pub use llm::{ChatBackend, LlmClient};
pub use models::{
    Category, FileKind, NewProcessedFile, ProcessedFile, ProcessedFileInfo, Transaction,
    TransactionType, DEMO_USER,
};
pub use ocr::{OcrConfig, OcrRetryPolicy, OcrSpaceClient, TextRecognizer};
pub use processor::{Extraction, FileProcessor};
pub use stats::{SpendingSummary, TrendPeriod, TrendsReport};
pub use store::TransactionStore;

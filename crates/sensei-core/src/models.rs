//! Domain models for UPISensei

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The single demo user that owns every record in this deployment
pub const DEMO_USER: &str = "demo-user";

/// A transaction recovered from a statement (or canned demo data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    /// Free text, at most 200 characters
    pub description: String,
    /// Always positive; direction lives in `tx_type`
    pub amount: f64,
    pub category: Category,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub merchant: String,
    pub bank: String,
    /// True for fallback/seed records that did not come from an upload
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_demo: bool,
}

/// Debit or credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" | "dr" => Ok(Self::Debit),
            "credit" | "cr" => Ok(Self::Credit),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed spending categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Dining")]
    FoodDining,
    Shopping,
    Transportation,
    Groceries,
    Entertainment,
    Utilities,
    Income,
    Healthcare,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FoodDining => "Food & Dining",
            Self::Shopping => "Shopping",
            Self::Transportation => "Transportation",
            Self::Groceries => "Groceries",
            Self::Entertainment => "Entertainment",
            Self::Utilities => "Utilities",
            Self::Income => "Income",
            Self::Healthcare => "Healthcare",
            Self::Other => "Other",
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Self::FoodDining,
            Self::Shopping,
            Self::Transportation,
            Self::Groceries,
            Self::Entertainment,
            Self::Utilities,
            Self::Income,
            Self::Healthcare,
            Self::Other,
        ]
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of uploaded statement, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Csv,
}

impl FileKind {
    /// Detect the kind from a filename (case-insensitive extension)
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".csv") {
            Some(Self::Csv)
        } else {
            None
        }
    }

    /// Upload size limit in bytes (PDF 7 MB, CSV 5 MB)
    pub fn max_upload_bytes(&self) -> usize {
        match self {
            Self::Pdf => 7 * 1024 * 1024,
            Self::Csv => 5 * 1024 * 1024,
        }
    }

    /// Source tag used in generated transaction ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
        }
    }

    /// Label shown to API clients
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF (OCR)",
            Self::Csv => "CSV",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id_prefix())
    }
}

/// An uploaded statement and everything derived from it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
    /// Why demo data was substituted, when it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// Input for creating a processed file record
#[derive(Debug, Clone)]
pub struct NewProcessedFile {
    pub user_id: String,
    pub filename: String,
    pub mime_type: String,
    pub transactions: Vec<Transaction>,
    pub fallback: Option<String>,
}

/// Summary of a processed file without its transactions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFileInfo {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub transaction_count: usize,
    pub is_demo: bool,
}

impl From<&ProcessedFile> for ProcessedFileInfo {
    fn from(file: &ProcessedFile) -> Self {
        Self {
            id: file.id.clone(),
            filename: file.filename.clone(),
            mime_type: file.mime_type.clone(),
            uploaded_at: file.uploaded_at,
            transaction_count: file.transactions.len(),
            is_demo: file.fallback.is_some(),
        }
    }
}

//! Transaction extraction from statement content
//!
//! Two extractors feed the file processor:
//! - [`TextExtractor`]: OCR'd PDF text, scanned line by line against ordered
//!   [`LinePattern`] strategies
//! - [`CsvExtractor`]: CSV exports, header probing with a positional fallback
//!
//! Both return at most [`MAX_RECORDS`] transactions and never fail on
//! malformed input; they simply recover fewer records.

pub mod csv;
pub mod text;

pub use self::csv::CsvExtractor;
pub use text::{Candidate, LargestAmount, LinePattern, RegexPattern, TextExtractor};

use chrono::NaiveDate;

use crate::categorize::{categorize, extract_merchant};
use crate::fields::{round_cents, truncate_description};
use crate::models::{Transaction, TransactionType, DEMO_USER};

/// Upper bound on records returned by a single extraction
pub const MAX_RECORDS: usize = 100;

/// Fields recovered for one record before categorization
#[derive(Debug, Clone)]
pub(crate) struct RecordParts {
    pub description: String,
    pub amount: f64,
    pub tx_type: TransactionType,
    pub date: NaiveDate,
}

/// Finish a record: normalize amount and description, categorize, attach bank
pub(crate) fn build_transaction(id: String, parts: RecordParts, bank: &str) -> Transaction {
    Transaction {
        id,
        user_id: DEMO_USER.to_string(),
        date: parts.date,
        category: categorize(&parts.description),
        merchant: extract_merchant(&parts.description),
        description: truncate_description(&parts.description),
        amount: round_cents(parts.amount.abs()),
        tx_type: parts.tx_type,
        bank: bank.to_string(),
        is_demo: false,
    }
}

/// Transaction id: `<prefix>_<millis>_<index>`
pub(crate) fn transaction_id(prefix: &str, stamp_millis: i64, index: usize) -> String {
    format!("{}_{}_{}", prefix, stamp_millis, index)
}

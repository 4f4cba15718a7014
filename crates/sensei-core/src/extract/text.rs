//! Transaction extraction from OCR'd statement text
//!
//! Each retained line is offered to an ordered list of [`LinePattern`]
//! strategies. The first strategy whose candidate passes acceptance wins the
//! line; a line contributes at most one record. Records are dated by line
//! order since OCR'd dates are too unreliable to trust.

use chrono::{NaiveDate, Utc};
use regex::Regex;
use tracing::debug;

use super::{build_transaction, transaction_id, RecordParts, MAX_RECORDS};
use crate::categorize::bank_from_filename;
use crate::error::Result;
use crate::fields::{parse_amount, synthesized_date, INLINE_AMOUNT_PATTERN};
use crate::models::{Transaction, TransactionType};

/// Lines this short (after trimming) carry no transaction
const MIN_LINE_CHARS: usize = 10;
/// Descriptions must be longer than this
const MIN_DESCRIPTION_CHARS: usize = 5;
/// Amounts at or below this are noise (page numbers, fragments)
const MIN_ABS_AMOUNT: f64 = 0.1;

/// Keywords that mark money coming in; checked before debit keywords
const CREDIT_KEYWORDS: &[&str] = &["credit", "salary", "deposit", "refund", "interest"];
const DEBIT_KEYWORDS: &[&str] = &["debit", "payment", "withdrawal", "purchase", "pos", "upi"];

/// A (description, signed amount) pair recovered from one line
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub description: String,
    pub amount: f64,
}

impl Candidate {
    /// Whether this candidate is plausible enough to keep
    pub fn is_acceptable(&self) -> bool {
        self.amount.is_finite()
            && self.amount.abs() > MIN_ABS_AMOUNT
            && self.description.trim().chars().count() > MIN_DESCRIPTION_CHARS
    }
}

/// A strategy for pulling a transaction candidate out of a single line
pub trait LinePattern: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Try to recover a candidate; `None` when the line doesn't fit
    fn attempt(&self, line: &str) -> Option<Candidate>;
}

/// Regex strategy with one capture group for the description and one for
/// the amount
pub struct RegexPattern {
    name: String,
    regex: Regex,
    description_group: usize,
    amount_group: usize,
}

impl RegexPattern {
    pub fn new(
        name: &str,
        pattern: &str,
        description_group: usize,
        amount_group: usize,
    ) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            regex: Regex::new(pattern)?,
            description_group,
            amount_group,
        })
    }

    /// `15/01/2024 SWIGGY INSTAMART 845.50`
    pub fn dated_line() -> Result<Self> {
        Self::new(
            "dated",
            &format!(
                r"(?i)(\d{{1,2}}[/\-.]\d{{1,2}}[/\-.]\d{{2,4}})\s+(.*?)\s+({})",
                INLINE_AMOUNT_PATTERN
            ),
            2,
            3,
        )
    }

    /// `UPI/412345678901/SWIGGY/PAYMENT 845.50`
    pub fn upi_reference() -> Result<Self> {
        Self::new(
            "upi",
            &format!(
                r"(?i)(UPI[/\-].*?[/\-].*?[/\-].*?)\s+({})",
                INLINE_AMOUNT_PATTERN
            ),
            1,
            2,
        )
    }

    /// `POS 4321 AMAZON RETAIL 2,499.00`
    pub fn pos_reference() -> Result<Self> {
        Self::new(
            "pos",
            &format!(r"(?i)(POS\s+\d+\s+.*?)\s+({})", INLINE_AMOUNT_PATTERN),
            1,
            2,
        )
    }

    /// `NEFT-HDFC0001-ACME PAYROLL 75,000.00`
    pub fn bank_transfer_reference() -> Result<Self> {
        Self::new(
            "transfer",
            &format!(r"(?i)((?:NEFT|IMPS|RTGS).*?)\s+({})", INLINE_AMOUNT_PATTERN),
            1,
            2,
        )
    }
}

impl LinePattern for RegexPattern {
    fn name(&self) -> &str {
        &self.name
    }

    fn attempt(&self, line: &str) -> Option<Candidate> {
        let caps = self.regex.captures(line)?;
        let description = caps.get(self.description_group)?.as_str().trim();
        let amount = parse_amount(caps.get(self.amount_group)?.as_str())?;
        Some(Candidate {
            description: description.to_string(),
            amount,
        })
    }
}

/// Last-resort strategy: the numerically largest amount-like substring is
/// the amount, the rest of the line is the description
pub struct LargestAmount {
    regex: Regex,
}

impl LargestAmount {
    pub fn new() -> Result<Self> {
        Ok(Self {
            regex: Regex::new(INLINE_AMOUNT_PATTERN)?,
        })
    }
}

impl LinePattern for LargestAmount {
    fn name(&self) -> &str {
        "largest-amount"
    }

    fn attempt(&self, line: &str) -> Option<Candidate> {
        let mut best: Option<(&str, f64)> = None;
        for m in self.regex.find_iter(line) {
            let Some(value) = parse_amount(m.as_str()) else {
                continue;
            };
            // Strictly greater keeps the first of equal maxima
            if best.map_or(true, |(_, b)| value.abs() > b.abs()) {
                best = Some((m.as_str(), value));
            }
        }

        let (raw, amount) = best?;
        Some(Candidate {
            description: line.replacen(raw, "", 1).trim().to_string(),
            amount,
        })
    }
}

/// Guess direction from description keywords, then from the sign
pub fn infer_type(description: &str, signed_amount: f64) -> TransactionType {
    let desc = description.to_lowercase();
    if CREDIT_KEYWORDS.iter().any(|k| desc.contains(k)) {
        return TransactionType::Credit;
    }
    if DEBIT_KEYWORDS.iter().any(|k| desc.contains(k)) {
        return TransactionType::Debit;
    }
    if signed_amount < 0.0 {
        TransactionType::Debit
    } else {
        TransactionType::Credit
    }
}

/// Whether an OCR line could hold a transaction at all
fn is_candidate_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.chars().count() <= MIN_LINE_CHARS || trimmed.starts_with("--- Page") {
        return false;
    }
    // Bare page numbers
    !trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Extracts transactions from OCR text using ordered line strategies
pub struct TextExtractor {
    patterns: Vec<Box<dyn LinePattern>>,
}

impl TextExtractor {
    /// Default strategy order: dated line, UPI, POS, NEFT/IMPS/RTGS, then
    /// the largest-amount fallback
    pub fn new() -> Result<Self> {
        Ok(Self::with_patterns(vec![
            Box::new(RegexPattern::dated_line()?),
            Box::new(RegexPattern::upi_reference()?),
            Box::new(RegexPattern::pos_reference()?),
            Box::new(RegexPattern::bank_transfer_reference()?),
            Box::new(LargestAmount::new()?),
        ]))
    }

    pub fn with_patterns(patterns: Vec<Box<dyn LinePattern>>) -> Self {
        Self { patterns }
    }

    /// Accepted candidates keyed by their index among the retained lines
    pub fn candidates(&self, text: &str) -> Vec<(usize, Candidate)> {
        text.lines()
            .filter(|line| is_candidate_line(line))
            .enumerate()
            .filter_map(|(index, line)| {
                self.patterns.iter().find_map(|pattern| {
                    let candidate = pattern.attempt(line)?;
                    if !candidate.is_acceptable() {
                        return None;
                    }
                    debug!(line = index, pattern = pattern.name(), "Matched OCR line");
                    Some((index, candidate))
                })
            })
            .collect()
    }

    /// Extract dated, categorized transactions from OCR text
    pub fn extract(&self, text: &str, filename: &str, today: NaiveDate) -> Vec<Transaction> {
        let candidates = self.candidates(text);
        let total = candidates.len();
        let bank = bank_from_filename(filename);
        let stamp = Utc::now().timestamp_millis();

        let transactions: Vec<Transaction> = candidates
            .into_iter()
            .take(MAX_RECORDS)
            .enumerate()
            .map(|(i, (_, candidate))| {
                let parts = RecordParts {
                    tx_type: infer_type(&candidate.description, candidate.amount),
                    description: candidate.description,
                    amount: candidate.amount,
                    date: synthesized_date(today, i, total),
                };
                build_transaction(transaction_id("pdf", stamp, i), parts, &bank)
            })
            .collect();

        debug!(
            found = total,
            kept = transactions.len(),
            "Extracted transactions from OCR text"
        );
        transactions
    }
}

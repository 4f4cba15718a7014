//! Transaction extraction from CSV statement exports
//!
//! Bank exports disagree on everything: column names, amount notation, date
//! formats. Header mode probes a prioritized list of column names for each
//! field. When that yields nothing (no recognizable headers, or no header row
//! at all) every raw row is scanned positionally instead.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use super::{build_transaction, transaction_id, RecordParts, MAX_RECORDS};
use crate::categorize::bank_from_filename;
use crate::error::Result;
use crate::fields::{
    clean_amount, looks_like_amount, looks_like_date, parse_date, parse_float_prefix,
    round_cents, synthesized_date,
};
use crate::models::{Transaction, TransactionType};

/// Columns probed for each field, in priority order (matched case-insensitively)
const DESCRIPTION_COLUMNS: &[&str] = &["description", "narration", "remarks", "particulars"];
const AMOUNT_COLUMNS: &[&str] = &["amount", "transaction_amount", "debit", "credit"];
const DATE_COLUMNS: &[&str] = &["date", "transaction_date", "value_date"];

const DEFAULT_DESCRIPTION: &str = "Unknown Transaction";

/// Amounts at or below this are dropped
const MIN_AMOUNT: f64 = 0.01;
/// Header-less descriptions must be longer than this
const MIN_DESCRIPTION_CHARS: usize = 5;

/// A CSV row with headers normalized to `lower_snake` keys
struct Row<'a> {
    cells: HashMap<String, &'a str>,
}

impl<'a> Row<'a> {
    fn new(headers: &[String], record: &'a StringRecord) -> Self {
        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v))
            .collect();
        Self { cells }
    }

    /// First non-empty value among `columns`
    fn probe(&self, columns: &[&str]) -> Option<&'a str> {
        columns
            .iter()
            .filter_map(|c| self.cells.get(*c).copied())
            .find(|v| !v.trim().is_empty())
    }

    fn non_empty(&self, column: &str) -> bool {
        self.cells
            .get(column)
            .is_some_and(|v| !v.trim().is_empty())
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace([' ', '-'], "_")
}

/// `abs(parseFloat(cleaned))`, `None` when unparseable or too small to keep
pub fn csv_amount(raw: &str) -> Option<f64> {
    let value = parse_float_prefix(&clean_amount(raw))?.abs();
    (value.is_finite() && value > MIN_AMOUNT).then(|| round_cents(value))
}

/// Direction from the notation of a raw amount: `-`/`(..)`/`Dr` are debits,
/// `+`/`Cr` credits
pub fn type_from_notation(raw: &str) -> Option<TransactionType> {
    let s = raw.trim().to_lowercase();
    if s.starts_with('-') || s.starts_with('(') || s.ends_with("dr") {
        Some(TransactionType::Debit)
    } else if s.starts_with('+') || s.ends_with("cr") {
        Some(TransactionType::Credit)
    } else {
        None
    }
}

/// Extracts transactions from CSV exports
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExtractor;

impl CsvExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract transactions, trying header mode first and the positional
    /// scan when header mode recovers nothing
    pub fn extract(&self, data: &[u8], filename: &str, today: NaiveDate) -> Result<Vec<Transaction>> {
        let bank = bank_from_filename(filename);
        let stamp = Utc::now().timestamp_millis();

        let mut parts = self.header_rows(data, today)?;
        if parts.is_empty() {
            debug!(filename = %filename, "No rows via headers, scanning positionally");
            parts = self.positional_rows(data, today)?;
        }

        let transactions: Vec<Transaction> = parts
            .into_iter()
            .take(MAX_RECORDS)
            .map(|(row, parts)| build_transaction(transaction_id("csv", stamp, row), parts, &bank))
            .collect();

        debug!(count = transactions.len(), "Extracted transactions from CSV");
        Ok(transactions)
    }

    /// Header mode: probe known column names per row
    fn header_rows(&self, data: &[u8], today: NaiveDate) -> Result<Vec<(usize, RecordParts)>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(data);

        let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();
        let records: Vec<StringRecord> = rdr
            .records()
            .filter_map(|r| match r {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable CSV row");
                    None
                }
            })
            .collect();
        let total = records.len();

        let mut parts = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let row = Row::new(&headers, record);

            let raw_amount = row.probe(AMOUNT_COLUMNS).unwrap_or("0");
            let Some(amount) = csv_amount(raw_amount) else {
                continue;
            };

            let description = row.probe(DESCRIPTION_COLUMNS).unwrap_or(DEFAULT_DESCRIPTION);
            let date = match row.probe(DATE_COLUMNS) {
                Some(raw) => parse_date(raw).unwrap_or_else(|| synthesized_date(today, index, total)),
                None => today,
            };

            parts.push((
                index,
                RecordParts {
                    description: description.to_string(),
                    amount,
                    tx_type: Self::row_type(&row, raw_amount),
                    date,
                },
            ));
        }
        Ok(parts)
    }

    /// Explicit `type` column, then which of debit/credit is filled, then
    /// the amount's notation, then debit
    fn row_type(row: &Row<'_>, raw_amount: &str) -> TransactionType {
        if let Some(explicit) = row.probe(&["type"]).and_then(|t| t.parse::<TransactionType>().ok()) {
            return explicit;
        }
        if row.non_empty("debit") {
            return TransactionType::Debit;
        }
        if row.non_empty("credit") {
            return TransactionType::Credit;
        }
        type_from_notation(raw_amount).unwrap_or(TransactionType::Debit)
    }

    /// Positional mode: every raw row, header included
    fn positional_rows(&self, data: &[u8], today: NaiveDate) -> Result<Vec<(usize, RecordParts)>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(data);

        let records: Vec<StringRecord> = rdr.records().filter_map(|r| r.ok()).collect();
        let total = records.len();

        let mut parts = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let cells: Vec<&str> = record.iter().collect();

            let Some(amount_at) = cells.iter().position(|c| looks_like_amount(c)) else {
                continue;
            };
            let raw_amount = cells[amount_at];
            let Some(amount) = csv_amount(raw_amount) else {
                continue;
            };

            let date_at = cells.iter().position(|c| looks_like_date(c));
            let date = date_at
                .and_then(|i| parse_date(cells[i]))
                .unwrap_or_else(|| synthesized_date(today, index, total));

            let description = cells
                .iter()
                .enumerate()
                .filter(|(i, c)| {
                    *i != amount_at
                        && Some(*i) != date_at
                        && c.chars().count() > MIN_DESCRIPTION_CHARS
                })
                .max_by_key(|(i, c)| (c.chars().count(), std::cmp::Reverse(*i)))
                .map(|(_, c)| *c)
                .unwrap_or(DEFAULT_DESCRIPTION);

            parts.push((
                index,
                RecordParts {
                    description: description.to_string(),
                    amount,
                    tx_type: type_from_notation(raw_amount).unwrap_or(TransactionType::Debit),
                    date,
                },
            ));
        }
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn extract(csv: &str) -> Vec<Transaction> {
        CsvExtractor::new()
            .extract(csv.as_bytes(), "statement.csv", today())
            .unwrap()
    }

    #[test]
    fn test_single_swiggy_row() {
        let txs = extract("date,description,amount\n2024-01-15,SWIGGY INSTAMART,845.50\n");
        assert_eq!(txs.len(), 1);
        let tx = &txs[0];
        assert_eq!(tx.amount, 845.5);
        assert_eq!(tx.category, Category::FoodDining);
        assert_eq!(tx.merchant, "Swiggy");
        assert_eq!(tx.tx_type, TransactionType::Debit);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(tx.bank, "Bank");
        assert!(tx.id.starts_with("csv_"));
    }

    #[test]
    fn test_csv_amount_semantics() {
        assert_eq!(csv_amount("₹1,234.56"), Some(1234.56));
        assert_eq!(csv_amount("-500"), Some(500.0));
        assert_eq!(csv_amount("(45.00)"), Some(45.0));
        assert_eq!(csv_amount("12.5abc"), Some(12.5));
        assert_eq!(csv_amount("0.01"), None);
        assert_eq!(csv_amount("0.02"), Some(0.02));
        assert_eq!(csv_amount("abc"), None);
    }

    #[test]
    fn test_header_probing_case_insensitive() {
        let csv = "\
Value Date,Narration,Withdrawal,Debit,Credit
15/01/2024,ZOMATO ORDER,,1200.00,
16/01/2024,SALARY ACME,,,75000.00
17/01/2024,NOTHING HERE,,,
";
        let txs = extract(csv);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].description, "ZOMATO ORDER");
        assert_eq!(txs[0].amount, 1200.0);
        assert_eq!(txs[0].tx_type, TransactionType::Debit);
        assert_eq!(txs[1].amount, 75000.0);
        assert_eq!(txs[1].tx_type, TransactionType::Credit);
        assert_eq!(txs[1].category, Category::Income);
    }

    #[test]
    fn test_explicit_type_column_wins() {
        let csv = "Date,Description,Amount,Type\n2024-01-10,REFUND FROM AMAZON,-99,CR\n";
        let txs = extract(csv);
        assert_eq!(txs[0].tx_type, TransactionType::Credit);
        assert_eq!(txs[0].amount, 99.0);
    }

    #[test]
    fn test_notation_sets_type() {
        let csv = "\
date,description,amount
2024-01-10,UBER TRIP HOME,-356
2024-01-11,CASHBACK BONUS,+50
2024-01-12,ELECTRICITY BILL,1500 Dr
2024-01-13,INTEREST PAID,12 Cr
";
        let types: Vec<_> = extract(csv).iter().map(|t| t.tx_type).collect();
        assert_eq!(
            types,
            vec![
                TransactionType::Debit,
                TransactionType::Credit,
                TransactionType::Debit,
                TransactionType::Credit
            ]
        );
    }

    #[test]
    fn test_defaults_and_synthesized_dates() {
        let csv = "\
date,amount
not-a-date,10
also-bad,20
";
        let txs = extract(csv);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].description, DEFAULT_DESCRIPTION);
        assert!(txs[0].date < txs[1].date);

        // No date column at all: today
        let txs = extract("description,amount\nNETFLIX SUBSCRIPTION,649\n");
        assert_eq!(txs[0].date, today());
    }

    #[test]
    fn test_headerless_fallback() {
        let csv = "\
15/01/2024,SWIGGY INSTAMART ORDER,845.50
16/01/2024,AMAZON IN PURCHASE,\"2,499.00\"
junk,row
";
        let txs = extract(csv);
        // No known headers, so every row is scanned positionally
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].description, "SWIGGY INSTAMART ORDER");
        assert_eq!(txs[0].amount, 845.5);
        assert_eq!(txs[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(txs[1].amount, 2499.0);
        assert_eq!(txs[1].category, Category::Shopping);
    }

    #[test]
    fn test_output_bounded() {
        let mut csv = String::from("date,description,amount\n");
        for i in 0..150 {
            csv.push_str(&format!("2024-01-15,MERCHANT NUMBER {},{}.00\n", i, i + 1));
        }
        assert_eq!(extract(&csv).len(), MAX_RECORDS);
    }

    #[test]
    fn test_empty_input() {
        assert!(extract("").is_empty());
        assert!(extract("just,some,words\nno,numbers,here\n").is_empty());
    }
}

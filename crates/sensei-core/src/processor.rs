//! Statement processing: PDF/CSV dispatch with demo-data fallback
//!
//! Processing never fails outward. When extraction errors or comes back
//! empty the caller still gets transactions to show, but the result is an
//! [`Extraction::Fallback`] carrying the reason, so real data and filler can
//! always be told apart.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use tracing::{info, warn};

use crate::categorize::bank_from_filename;
use crate::error::{Error, Result};
use crate::extract::{transaction_id, CsvExtractor, TextExtractor};
use crate::fields::synthesized_date;
use crate::models::{Category, FileKind, Transaction, TransactionType, DEMO_USER};
use crate::ocr::TextRecognizer;

/// Canned records: description, amount, category, type, merchant
const DEMO_FIXTURES: &[(&str, f64, Category, TransactionType, &str)] = &[
    ("SWIGGY INSTAMART", 845.50, Category::FoodDining, TransactionType::Debit, "Swiggy"),
    ("AMAZON IN", 2499.00, Category::Shopping, TransactionType::Debit, "Amazon"),
    ("UBER TRIP", 356.00, Category::Transportation, TransactionType::Debit, "Uber"),
    ("SALARY CREDIT", 75000.00, Category::Income, TransactionType::Credit, "Company"),
    ("NETFLIX SUBSCRIPTION", 649.00, Category::Entertainment, TransactionType::Debit, "Netflix"),
    ("ZOMATO ORDER", 1200.00, Category::FoodDining, TransactionType::Debit, "Zomato"),
    ("MYNTRA FASHION", 3500.00, Category::Shopping, TransactionType::Debit, "Myntra"),
    ("BIGBASKET GROCERIES", 2800.00, Category::Groceries, TransactionType::Debit, "BigBasket"),
];

/// Outcome of processing one statement
#[derive(Debug, Clone)]
pub enum Extraction {
    /// Transactions recovered from the file itself
    Extracted(Vec<Transaction>),
    /// Extraction failed or found nothing; `transactions` are demo filler
    Fallback {
        reason: String,
        transactions: Vec<Transaction>,
    },
}

impl Extraction {
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            Self::Extracted(txs) => txs,
            Self::Fallback { transactions, .. } => transactions,
        }
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        match self {
            Self::Extracted(txs) => txs,
            Self::Fallback { transactions, .. } => transactions,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Self::Extracted(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Build the demo records, dated backward from `today` and flagged `is_demo`
///
/// `id_prefix` is the full id source tag, e.g. `pdf_demo` or `seed`.
pub fn demo_transactions(id_prefix: &str, bank: &str, today: NaiveDate) -> Vec<Transaction> {
    let stamp = Utc::now().timestamp_millis();
    let total = DEMO_FIXTURES.len();
    DEMO_FIXTURES
        .iter()
        .enumerate()
        .map(|(i, &(description, amount, category, tx_type, merchant))| Transaction {
            id: transaction_id(id_prefix, stamp, i),
            user_id: DEMO_USER.to_string(),
            date: synthesized_date(today, i, total),
            description: description.to_string(),
            amount,
            category,
            tx_type,
            merchant: merchant.to_string(),
            bank: bank.to_string(),
            is_demo: true,
        })
        .collect()
}

/// Turns uploaded statements into transactions
pub struct FileProcessor {
    recognizer: Arc<dyn TextRecognizer>,
    text: TextExtractor,
    csv: CsvExtractor,
}

impl FileProcessor {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Result<Self> {
        Ok(Self {
            recognizer,
            text: TextExtractor::new()?,
            csv: CsvExtractor::new(),
        })
    }

    /// Process a statement dated relative to the local "today"
    pub async fn process(&self, data: &[u8], filename: &str, kind: FileKind) -> Extraction {
        self.process_on(data, filename, kind, Local::now().date_naive())
            .await
    }

    /// Process a statement with an explicit "today" for synthesized dates
    pub async fn process_on(
        &self,
        data: &[u8],
        filename: &str,
        kind: FileKind,
        today: NaiveDate,
    ) -> Extraction {
        let result = match kind {
            FileKind::Pdf => self.extract_pdf(data, filename, today).await,
            FileKind::Csv => self.extract_csv(data, filename, today),
        };

        match result {
            Ok(transactions) if !transactions.is_empty() => {
                info!(
                    filename = %filename,
                    kind = %kind,
                    count = transactions.len(),
                    "Processed statement"
                );
                Extraction::Extracted(transactions)
            }
            Ok(_) => Self::fallback(kind, filename, today, Self::empty_reason(kind)),
            Err(e) => Self::fallback(kind, filename, today, e.to_string()),
        }
    }

    pub async fn process_pdf(&self, data: &[u8], filename: &str) -> Extraction {
        self.process(data, filename, FileKind::Pdf).await
    }

    pub async fn process_csv(&self, data: &[u8], filename: &str) -> Extraction {
        self.process(data, filename, FileKind::Csv).await
    }

    async fn extract_pdf(
        &self,
        data: &[u8],
        filename: &str,
        today: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let text = self.recognizer.extract_text(data, filename).await?;
        if text.trim().is_empty() {
            return Err(Error::Extraction(
                "No text could be extracted from the PDF. The file might be scanned or image-based."
                    .into(),
            ));
        }
        Ok(self.text.extract(&text, filename, today))
    }

    fn extract_csv(&self, data: &[u8], filename: &str, today: NaiveDate) -> Result<Vec<Transaction>> {
        self.csv.extract(data, filename, today)
    }

    fn empty_reason(kind: FileKind) -> String {
        match kind {
            FileKind::Pdf => {
                "No transactions found in the PDF. Please ensure it contains readable transaction data."
            }
            FileKind::Csv => "No valid transactions found in CSV. Please check the file format.",
        }
        .to_string()
    }

    fn fallback(kind: FileKind, filename: &str, today: NaiveDate, reason: String) -> Extraction {
        warn!(
            filename = %filename,
            kind = %kind,
            reason = %reason,
            "Extraction failed, substituting demo transactions"
        );
        let prefix = format!("{}_demo", kind.id_prefix());
        Extraction::Fallback {
            reason,
            transactions: demo_transactions(&prefix, &bank_from_filename(filename), today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Recognizer returning canned text or an error
    struct FixedText(Option<&'static str>);

    #[async_trait]
    impl TextRecognizer for FixedText {
        async fn extract_text(&self, _pdf: &[u8], _filename: &str) -> Result<String> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => Err(Error::OcrFailed {
                    pages: "1".into(),
                    last_error: "OCR request timeout".into(),
                }),
            }
        }
    }

    fn processor(text: Option<&'static str>) -> FileProcessor {
        FileProcessor::new(Arc::new(FixedText(text))).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_demo_transactions() {
        let txs = demo_transactions("pdf_demo", "HDFC Bank", today());
        assert_eq!(txs.len(), 8);
        assert!(txs.iter().all(|t| t.is_demo && t.amount > 0.0));
        assert!(txs[0].id.starts_with("pdf_demo_"));
        assert!(txs.windows(2).all(|w| w[0].date <= w[1].date));
        assert_eq!(txs[7].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(txs[3].tx_type, TransactionType::Credit);
    }

    #[tokio::test]
    async fn test_pdf_extracted() {
        let p = processor(Some("--- Page 1 ---\n15/01/2024 SWIGGY INSTAMART 845.50"));
        let result = p.process_on(b"%PDF", "stmt.pdf", FileKind::Pdf, today()).await;
        assert!(!result.is_fallback());
        assert_eq!(result.transactions().len(), 1);
        assert!(!result.transactions()[0].is_demo);
    }

    #[tokio::test]
    async fn test_pdf_ocr_failure_falls_back() {
        let result = processor(None).process_pdf(b"garbage", "hdfc.pdf").await;
        assert!(result.is_fallback());
        assert!(result.fallback_reason().unwrap().contains("OCR failed"));
        let txs = result.into_transactions();
        assert_eq!(txs.len(), 8);
        assert!(txs.iter().all(|t| t.is_demo && t.bank == "HDFC Bank"));
    }

    #[tokio::test]
    async fn test_pdf_empty_text_falls_back() {
        let result = processor(Some("   \n")).process_pdf(b"", "a.pdf").await;
        assert!(result.fallback_reason().unwrap().contains("No text"));
        assert!(!result.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_pdf_no_matches_falls_back() {
        let result = processor(Some("nothing useful\nshort")).process_pdf(b"x", "a.pdf").await;
        assert!(result.fallback_reason().unwrap().contains("No transactions found"));
    }

    #[tokio::test]
    async fn test_csv_garbage_falls_back() {
        let p = processor(None);
        let inputs: [&[u8]; 3] = [b"", b"\xff\xfe\x00garbage", b"hello,world\nfoo,bar\n"];
        for input in inputs {
            let result = p.process_csv(input, "export.csv").await;
            assert!(result.is_fallback());
            let txs = result.transactions();
            assert!(!txs.is_empty());
            assert!(txs.iter().all(|t| t.is_demo && t.id.starts_with("csv_demo_")));
        }
    }

    #[tokio::test]
    async fn test_csv_extracted() {
        let csv = b"date,description,amount\n2024-01-15,SWIGGY INSTAMART,845.50\n";
        let result = processor(None).process_csv(csv, "export.csv").await;
        match result {
            Extraction::Extracted(txs) => {
                assert_eq!(txs.len(), 1);
                assert_eq!(txs[0].merchant, "Swiggy");
            }
            Extraction::Fallback { reason, .. } => panic!("unexpected fallback: {}", reason),
        }
    }
}

//! In-memory transaction and file store
//!
//! Lives for the process lifetime only. The server holds one instance in its
//! shared state; tests build a fresh one per case.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::categorize::GENERIC_BANK;
use crate::models::{NewProcessedFile, ProcessedFile, Transaction};
use crate::processor::demo_transactions;

#[derive(Debug, Default)]
struct StoreData {
    transactions: Vec<Transaction>,
    files: Vec<ProcessedFile>,
}

/// Repository for transactions and processed statement files
#[derive(Debug, Default)]
pub struct TransactionStore {
    data: RwLock<StoreData>,
    file_seq: AtomicU64,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with the demo user's canned transactions
    pub async fn with_demo_seed(today: NaiveDate) -> Self {
        let store = Self::new();
        store.seed_demo(today).await;
        store
    }

    /// Append the canned demo transactions, returning how many were added
    pub async fn seed_demo(&self, today: NaiveDate) -> usize {
        let seed = demo_transactions("seed", GENERIC_BANK, today);
        let count = seed.len();
        self.add_transactions(seed).await;
        count
    }

    /// All transactions owned by `user_id`, in insertion order
    pub async fn transactions_for(&self, user_id: &str) -> Vec<Transaction> {
        let data = self.data.read().await;
        data.transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn add_transactions(&self, transactions: Vec<Transaction>) {
        let mut data = self.data.write().await;
        debug!(count = transactions.len(), "Storing transactions");
        data.transactions.extend(transactions);
    }

    /// Record a processed upload and return its generated id
    pub async fn save_processed_file(&self, file: NewProcessedFile) -> String {
        let seq = self.file_seq.fetch_add(1, Ordering::Relaxed);
        let uploaded_at = Utc::now();
        let id = format!("file_{}_{}", uploaded_at.timestamp_millis(), seq);

        let record = ProcessedFile {
            id: id.clone(),
            user_id: file.user_id,
            filename: file.filename,
            mime_type: file.mime_type,
            uploaded_at,
            transactions: file.transactions,
            fallback: file.fallback,
        };

        self.data.write().await.files.push(record);
        id
    }

    pub async fn processed_file(&self, id: &str) -> Option<ProcessedFile> {
        let data = self.data.read().await;
        data.files.iter().find(|f| f.id == id).cloned()
    }

    /// Files uploaded by `user_id`, oldest first
    pub async fn files_for(&self, user_id: &str) -> Vec<ProcessedFile> {
        let data = self.data.read().await;
        data.files
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect()
    }

    /// The subset of `ids` that exist and belong to `user_id`
    pub async fn files_by_ids(&self, user_id: &str, ids: &[String]) -> Vec<ProcessedFile> {
        let data = self.data.read().await;
        data.files
            .iter()
            .filter(|f| f.user_id == user_id && ids.contains(&f.id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEMO_USER;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn new_file(name: &str, user: &str) -> NewProcessedFile {
        NewProcessedFile {
            user_id: user.to_string(),
            filename: name.to_string(),
            mime_type: "text/csv".to_string(),
            transactions: demo_transactions("csv", GENERIC_BANK, today()),
            fallback: None,
        }
    }

    #[tokio::test]
    async fn test_fresh_store_is_empty() {
        let store = TransactionStore::new();
        assert!(store.transactions_for(DEMO_USER).await.is_empty());
        assert!(store.files_for(DEMO_USER).await.is_empty());
    }

    #[tokio::test]
    async fn test_seed_and_append() {
        let store = TransactionStore::with_demo_seed(today()).await;
        assert_eq!(store.transactions_for(DEMO_USER).await.len(), 8);

        let mut other = demo_transactions("csv", GENERIC_BANK, today());
        other[0].user_id = "someone-else".to_string();
        store.add_transactions(other).await;

        assert_eq!(store.transactions_for(DEMO_USER).await.len(), 15);
        assert_eq!(store.transactions_for("someone-else").await.len(), 1);
    }

    #[tokio::test]
    async fn test_processed_files() {
        let store = TransactionStore::new();
        let a = store.save_processed_file(new_file("a.csv", DEMO_USER)).await;
        let b = store.save_processed_file(new_file("b.csv", DEMO_USER)).await;
        let c = store.save_processed_file(new_file("c.csv", "other")).await;

        assert_ne!(a, b);
        assert!(a.starts_with("file_"));

        let file = store.processed_file(&b).await.unwrap();
        assert_eq!(file.filename, "b.csv");
        assert_eq!(file.transactions.len(), 8);
        assert!(store.processed_file("file_missing").await.is_none());

        assert_eq!(store.files_for(DEMO_USER).await.len(), 2);

        let picked = store
            .files_by_ids(DEMO_USER, &[a.clone(), c.clone(), "nope".to_string()])
            .await;
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, a);
    }
}

//! Transaction and processed-file handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use sensei_core::models::{
    Category, ProcessedFile, ProcessedFileInfo, Transaction, TransactionType, DEMO_USER,
};

/// Query parameters for listing transactions
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Display name, e.g. `Food & Dining`
    pub category: Option<String>,
    /// `debit` or `credit`
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub transactions: Vec<Transaction>,
    /// Matches before pagination
    pub total: usize,
}

/// GET /api/transactions - Current user's transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTransactionsQuery>,
) -> Result<Json<TransactionList>, AppError> {
    let category = params
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;
    let tx_type = params
        .tx_type
        .as_deref()
        .map(str::parse::<TransactionType>)
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;
    let limit = params.limit.unwrap_or(100).min(MAX_PAGE_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let mut transactions: Vec<Transaction> = state
        .store
        .transactions_for(DEMO_USER)
        .await
        .into_iter()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .filter(|t| tx_type.map_or(true, |k| t.tx_type == k))
        .collect();
    transactions.sort_by(|a, b| b.date.cmp(&a.date));

    let total = transactions.len();
    let transactions = transactions.into_iter().skip(offset).take(limit).collect();

    Ok(Json(TransactionList {
        transactions,
        total,
    }))
}

/// GET /api/files - Uploaded statements without their transactions
pub async fn list_files(State(state): State<Arc<AppState>>) -> Json<Vec<ProcessedFileInfo>> {
    let files = state.store.files_for(DEMO_USER).await;
    Json(files.iter().map(ProcessedFileInfo::from).collect())
}

/// GET /api/files/:id - One uploaded statement with its transactions
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProcessedFile>, AppError> {
    state
        .store
        .processed_file(&id)
        .await
        .filter(|f| f.user_id == DEMO_USER)
        .map(Json)
        .ok_or_else(|| AppError::not_found(&format!("File not found: {}", id)))
}

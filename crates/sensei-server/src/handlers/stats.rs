//! Spending stats handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::{AppError, AppState};
use sensei_core::models::DEMO_USER;
use sensei_core::stats::{
    category_breakdown, insights, summarize, trends, CategoryBreakdownReport, Insight,
    SpendingSummary, TrendPeriod, TrendsReport,
};

/// GET /api/stats/summary - Totals, categories, top merchants
pub async fn stats_summary(State(state): State<Arc<AppState>>) -> Json<SpendingSummary> {
    let transactions = state.store.transactions_for(DEMO_USER).await;
    Json(summarize(&transactions))
}

/// Query parameters for trends
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    /// daily, weekly or monthly (default)
    pub period: Option<String>,
}

/// GET /api/stats/trends - Debit totals over time
pub async fn stats_trends(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendsQuery>,
) -> Result<Json<TrendsReport>, AppError> {
    let period = params
        .period
        .as_deref()
        .map(str::parse::<TrendPeriod>)
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?
        .unwrap_or_default();

    let transactions = state.store.transactions_for(DEMO_USER).await;
    debug!(period = period.as_str(), transactions = transactions.len(), "Computing trends");
    Ok(Json(trends(&transactions, period)))
}

/// GET /api/stats/categories - Debit totals per category with sample transactions
pub async fn stats_categories(State(state): State<Arc<AppState>>) -> Json<CategoryBreakdownReport> {
    let transactions = state.store.transactions_for(DEMO_USER).await;
    Json(category_breakdown(&transactions))
}

/// GET /api/stats/insights - Rule-based spending alerts
pub async fn stats_insights(State(state): State<Arc<AppState>>) -> Json<Vec<Insight>> {
    let transactions = state.store.transactions_for(DEMO_USER).await;
    let found = insights(&transactions);
    debug!(insights = found.len(), "Generated insights");
    Json(found)
}

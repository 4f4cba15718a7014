//! Statement extraction command

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use sensei_core::models::{FileKind, TransactionType};
use sensei_core::{Extraction, FileProcessor, OcrSpaceClient, SenseiConfig};
use tracing::info;

use super::truncate;

/// Read a statement from disk and run it through the processor
pub async fn extract_file(
    processor: &FileProcessor,
    path: &Path,
    today: NaiveDate,
) -> Result<Extraction> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Statement path has no usable file name")?;
    let Some(kind) = FileKind::from_filename(filename) else {
        bail!("Only PDF and CSV files are allowed: {}", filename);
    };

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if data.is_empty() {
        bail!("File is empty: {}", path.display());
    }
    if data.len() > kind.max_upload_bytes() {
        bail!(
            "File size must be less than {}MB",
            kind.max_upload_bytes() / (1024 * 1024)
        );
    }

    info!(file = %filename, kind = %kind, bytes = data.len(), "Extracting statement");
    Ok(processor.process_on(&data, filename, kind, today).await)
}

pub async fn cmd_extract(
    config: &SenseiConfig,
    path: &Path,
    json: bool,
    today: Option<NaiveDate>,
) -> Result<()> {
    let ocr = OcrSpaceClient::new(config.ocr.clone());
    let processor = FileProcessor::new(Arc::new(ocr))?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let extraction = extract_file(&processor, path, today).await?;

    if let Some(reason) = extraction.fallback_reason() {
        eprintln!("⚠️  Extraction fell back to demo data: {}", reason);
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(extraction.transactions())?
        );
        return Ok(());
    }

    let transactions = extraction.transactions();
    println!("Transactions ({}):", transactions.len());
    println!(
        "  {:<10}  {:<40}  {:>12}  {:<16}  {:<6}",
        "Date", "Description", "Amount", "Category", "Type"
    );
    println!("  {}", "-".repeat(92));
    for tx in transactions {
        println!(
            "  {:<10}  {:<40}  {:>12.2}  {:<16}  {:<6}",
            tx.date,
            truncate(&tx.description, 40),
            tx.amount,
            truncate(tx.category.as_str(), 16),
            tx.tx_type
        );
    }

    let spent: f64 = transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Debit)
        .map(|t| t.amount)
        .sum();
    let income: f64 = transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Credit)
        .map(|t| t.amount)
        .sum();
    println!();
    println!("  Spent:  ₹{:.2}", spent);
    println!("  Income: ₹{:.2}", income);

    Ok(())
}

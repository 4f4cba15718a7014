//! Statement upload handler

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::{AppError, AppState};
use sensei_core::models::{FileKind, NewProcessedFile, DEMO_USER};

/// Response for upload endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
    pub message: String,
    pub transaction_count: usize,
    /// `PDF (OCR)` or `CSV`
    pub file_type: String,
    /// True when the transactions are demo filler
    pub is_demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// An uploaded file pulled out of the multipart form
struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

fn processing_suggestion(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Pdf => "Try uploading a CSV file for more reliable processing.",
        FileKind::Csv => "Please check your CSV format and try again.",
    }
}

fn default_mime(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Pdf => "application/pdf",
        FileKind::Csv => "text/csv",
    }
}

/// Body-limit rejections become the same 400 as an oversized file
fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::bad_request(&format!(
            "File size must be less than {}MB",
            FileKind::Pdf.max_upload_bytes() / 1024 / 1024
        ));
    }
    AppError::new(e.status(), "Failed to process file").with_details(e.body_text())
}

/// POST /api/upload - Extract transactions from a bank statement
///
/// Expects multipart form with:
/// - file: PDF (max 7MB) or CSV (max 5MB), by extension; bodies past the
///   request limit get the PDF size error
/// - mimeType: ignored; the file part's own content type is recorded
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some(UploadedFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    let upload = upload.ok_or_else(|| AppError::bad_request("No file provided"))?;
    let kind = FileKind::from_filename(&upload.filename)
        .ok_or_else(|| AppError::bad_request("Only PDF and CSV files are allowed"))?;

    let max_size = kind.max_upload_bytes();
    if upload.data.len() > max_size {
        return Err(AppError::bad_request(&format!(
            "File size must be less than {}MB",
            max_size / 1024 / 1024
        )));
    }
    if upload.data.is_empty() {
        return Err(AppError::bad_request("File processing failed")
            .with_details("File is empty")
            .with_suggestion(processing_suggestion(kind)));
    }

    let extraction = state
        .processor
        .process(&upload.data, &upload.filename, kind)
        .await;
    let fallback_reason = extraction.fallback_reason().map(str::to_string);
    let transactions = extraction.into_transactions();
    let count = transactions.len();

    state.store.add_transactions(transactions.clone()).await;
    let file_id = state
        .store
        .save_processed_file(NewProcessedFile {
            user_id: DEMO_USER.to_string(),
            filename: upload.filename.clone(),
            mime_type: upload
                .content_type
                .unwrap_or_else(|| default_mime(kind).to_string()),
            transactions,
            fallback: fallback_reason.clone(),
        })
        .await;

    info!(
        file_id = %file_id,
        filename = %upload.filename,
        count,
        demo = fallback_reason.is_some(),
        "Statement uploaded"
    );

    Ok(Json(UploadResponse {
        file_id,
        message: format!(
            "Successfully processed {} transactions from {}",
            count, upload.filename
        ),
        transaction_count: count,
        file_type: kind.label().to_string(),
        is_demo: fallback_reason.is_some(),
        fallback_reason,
    }))
}

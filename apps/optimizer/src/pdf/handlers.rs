//! Axum route handler for PDF text extraction.

use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;

use crate::errors::AppError;
use crate::pdf::extract_text;
use crate::resilience::{with_timeout, TIMEOUT_CEILING_MS};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ParsePdfResponse {
    pub success: bool,
    pub text: String,
    pub text_length: usize,
}

/// POST /api/v1/parse-pdf
///
/// Accepts a multipart upload with a `file` field and returns its text so the
/// client can feed it into /api/v1/optimize.
pub async fn handle_parse_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ParsePdfResponse>, AppError> {
    // Extraction has its own size-scaled deadline; this one only covers the upload.
    let pdf = with_timeout(
        read_file_field(multipart),
        Duration::from_millis(TIMEOUT_CEILING_MS),
        "pdf upload",
    )
    .await??;
    let text = extract_text(pdf, &state.config.timeouts).await?;

    Ok(Json(ParsePdfResponse {
        success: true,
        text_length: text.chars().count(),
        text,
    }))
}

async fn read_file_field(mut multipart: Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")));
        }
    }
    Err(AppError::Validation("Missing 'file' field".to_string()))
}

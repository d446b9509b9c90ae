//! Text extraction from uploaded PDF CVs.
//!
//! Extraction is CPU-bound and can stall on malformed files, so it runs on the
//! blocking pool under a deadline sized by the upload (`file` category).

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use crate::resilience::{with_timeout, TimeoutCategory, TimeoutError, TimeoutTable};

pub mod handlers;

/// Matches the upload limit of the parse endpoint.
pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("uploaded file is empty")]
    Empty,

    #[error("could not extract text from PDF: {0}")]
    Extraction(String),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("PDF extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Extracts plain text from a PDF held in memory.
///
/// On timeout the blocking thread is left to finish on its own; only the
/// caller stops waiting.
pub async fn extract_text(pdf: Bytes, timeouts: &TimeoutTable) -> Result<String, PdfError> {
    if pdf.is_empty() {
        return Err(PdfError::Empty);
    }

    let size = pdf.len();
    let timeout_ms = timeouts.timeout_for_len(size, TimeoutCategory::File);
    debug!("Parsing PDF: {size} bytes, timeout {timeout_ms}ms");

    let text = run_extraction(pdf, Duration::from_millis(timeout_ms), |bytes| {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string())
    })
    .await?;

    info!("PDF parsed: {size} bytes -> {} chars", text.chars().count());
    Ok(text)
}

async fn run_extraction<X>(pdf: Bytes, timeout: Duration, extract: X) -> Result<String, PdfError>
where
    X: FnOnce(&[u8]) -> Result<String, String> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || extract(&pdf));
    with_timeout(task, timeout, "pdf extraction")
        .await??
        .map_err(PdfError::Extraction)
}

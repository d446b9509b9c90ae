//! CV optimization pipeline: chunk → rewrite each chunk under the batch
//! executor → fall back per failed chunk → reassemble.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::resilience::{
    execute_batch, with_timeout, BatchEntry, BatchOptions, RetryOptions, TimeoutCategory,
    TimeoutTable, TOTAL_TIMEOUT_BUFFER_MS,
};

use super::chunker::{split_into_chunks, DEFAULT_MAX_CHUNK_CHARS};
use super::fallback::fallback_rewrite;
use super::rewriter::{CvRewriter, RewriteRequest};
use super::Language;

/// Anything shorter than this is treated as a broken rewrite.
pub const MIN_OUTPUT_CHARS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeRequest {
    pub cv_text: String,
    #[serde(default)]
    pub job_text: String,
    #[serde(default)]
    pub language: Language,
}

/// Tunables for the pipeline, loaded from `Config`.
#[derive(Debug, Clone)]
pub struct OptimizeSettings {
    pub max_chunk_chars: usize,
    pub inter_chunk_delay_ms: u64,
    /// Abort the whole CV on the first failed chunk instead of falling back.
    pub fail_fast: bool,
    /// Backoff shape for LLM calls; the per-attempt timeout is derived per chunk.
    pub retry: RetryOptions,
    pub timeouts: TimeoutTable,
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            inter_chunk_delay_ms: 1000,
            fail_fast: false,
            retry: RetryOptions::default(),
            timeouts: TimeoutTable::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeStats {
    pub original_length: usize,
    pub optimized_length: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeOutcome {
    pub optimized_cv: String,
    pub stats: OptimizeStats,
}

/// Wall-clock budget for rewriting `chunk_count` chunks one after another:
/// every chunk at its full budget, every pause between them, plus a buffer.
pub fn batch_budget_ms(per_chunk_ms: u64, chunk_count: usize, inter_chunk_delay_ms: u64) -> u64 {
    let pauses = chunk_count.saturating_sub(1) as u64;
    per_chunk_ms
        .saturating_mul(chunk_count as u64)
        .saturating_add(inter_chunk_delay_ms.saturating_mul(pauses))
        .saturating_add(TOTAL_TIMEOUT_BUFFER_MS)
}

/// Runs the full pipeline for one CV.
///
/// Chunks are rewritten strictly one after another with a pause in between.
/// Each chunk's LLM call is retried with backoff; the per-attempt timeout grows
/// with the chunk's length and the batch gives every chunk enough budget for
/// all of its attempts. The request deadline is the batch budget itself, so a
/// slow CV runs out of budget inside the batch (and falls back per chunk)
/// before the deadline can cut it off.
pub async fn optimize_cv(
    rewriter: &dyn CvRewriter,
    request: &OptimizeRequest,
    settings: &OptimizeSettings,
) -> Result<OptimizeOutcome, AppError> {
    let cv_text = request.cv_text.trim();
    if cv_text.is_empty() {
        return Err(AppError::Validation("cv_text is required".to_string()));
    }
    let original_length = cv_text.chars().count();

    let chunks = split_into_chunks(cv_text, settings.max_chunk_chars);
    let chunk_count = chunks.len();

    let retries: Vec<RetryOptions> = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            settings
                .retry
                .clone()
                .with_timeout_ms(
                    settings
                        .timeouts
                        .calculate_timeout_ms(chunk, TimeoutCategory::Ai),
                )
                .named(format!("llm rewrite chunk {}/{}", index + 1, chunk_count))
        })
        .collect();

    let per_chunk_ms = retries
        .iter()
        .map(RetryOptions::worst_case_ms)
        .max()
        .unwrap_or(settings.retry.timeout_ms);
    let budget_ms = batch_budget_ms(per_chunk_ms, chunk_count, settings.inter_chunk_delay_ms);
    let batch_options = BatchOptions {
        per_item_timeout_ms: Some(per_chunk_ms),
        total_timeout_ms: Some(budget_ms),
        inter_item_delay_ms: settings.inter_chunk_delay_ms,
        fail_fast: settings.fail_fast,
    };

    info!(
        "Optimizing CV: {} chars in {} chunk(s), budget {}ms, job posting: {}, language: {:?}",
        original_length,
        chunk_count,
        budget_ms,
        !request.job_text.trim().is_empty(),
        request.language
    );

    let job_text = request.job_text.as_str();
    let language = request.language;
    let retries = &retries;

    let batch = execute_batch(
        chunks.clone(),
        move |chunk: String, index| async move {
            rewriter
                .rewrite(RewriteRequest {
                    chunk: &chunk,
                    job_text,
                    language,
                    is_first_chunk: index == 0,
                    retry: &retries[index],
                })
                .await
        },
        &batch_options,
    );
    // The batch never starts a chunk it cannot finish within `budget_ms`.
    let entries = with_timeout(batch, Duration::from_millis(budget_ms), "cv optimization")
        .await?
        .map_err(|e| AppError::ServiceUnavailable(format!("CV optimization aborted: {e}")))?;

    let failed_chunks = entries.iter().filter(|e| !e.is_success()).count();
    if failed_chunks == chunk_count {
        return Err(AppError::ServiceUnavailable(format!(
            "all {chunk_count} chunk(s) failed"
        )));
    }

    let optimized_cv = entries
        .into_iter()
        .zip(chunks)
        .map(|(entry, original)| match entry {
            BatchEntry::Success(text) => text,
            BatchEntry::Failure { index, error } => {
                warn!(
                    "Chunk {}/{} falling back to rule-based rewrite: {error}",
                    index + 1,
                    chunk_count
                );
                fallback_rewrite(&original)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let optimized_length = optimized_cv.chars().count();
    if optimized_length < MIN_OUTPUT_CHARS {
        return Err(AppError::UnprocessableEntity(
            "Optimization resulted in unexpectedly short output".to_string(),
        ));
    }

    info!(
        "CV optimization completed: {original_length} -> {optimized_length} chars, {failed_chunks} fallback chunk(s)"
    );

    Ok(OptimizeOutcome {
        optimized_cv,
        stats: OptimizeStats {
            original_length,
            optimized_length,
            chunks: chunk_count,
            failed_chunks,
            processed_at: Utc::now(),
        },
    })
}

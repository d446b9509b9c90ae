//! Rewriter seam — turns one CV chunk into its optimized form.
//!
//! Default: `LlmRewriter` (chat completion with retry and backoff).
//! `AppState` holds an `Arc<dyn CvRewriter>` so tests can swap in a stub.

use async_trait::async_trait;

use crate::llm_client::{LlmClient, LlmError};
use crate::resilience::RetryOptions;

use super::prompts::{system_prompt, user_prompt};
use super::Language;

/// Everything a rewriter needs for one chunk.
#[derive(Debug, Clone)]
pub struct RewriteRequest<'a> {
    pub chunk: &'a str,
    pub job_text: &'a str,
    pub language: Language,
    pub is_first_chunk: bool,
    /// Per-attempt timeout and backoff for this chunk.
    pub retry: &'a RetryOptions,
}

#[async_trait]
pub trait CvRewriter: Send + Sync {
    async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<String, LlmError>;
}

pub struct LlmRewriter {
    llm: LlmClient,
}

impl LlmRewriter {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CvRewriter for LlmRewriter {
    async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<String, LlmError> {
        let system = system_prompt(request.language);
        let prompt = user_prompt(
            request.chunk,
            request.job_text,
            request.language,
            request.is_first_chunk,
        );
        self.llm.complete(&system, &prompt, request.retry).await
    }
}

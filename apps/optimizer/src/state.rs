use std::sync::Arc;

use crate::config::Config;
use crate::optimize::rewriter::CvRewriter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable chunk rewriter. Default: LlmRewriter backed by the Groq client.
    pub rewriter: Arc<dyn CvRewriter>,
}

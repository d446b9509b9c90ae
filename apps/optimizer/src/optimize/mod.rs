// CV optimization: chunking, LLM rewriting under the bounded batch executor,
// rule-based fallback for chunks the LLM could not produce.
// All LLM calls go through llm_client via the CvRewriter seam.

use serde::Deserialize;

pub mod chunker;
pub mod fallback;
pub mod handlers;
pub mod optimizer;
pub mod prompts;
pub mod rewriter;

/// Output language of the rewrite. Polish is the product's primary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pl,
    En,
}

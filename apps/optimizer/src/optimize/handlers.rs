//! Axum route handlers for the Optimize API.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::optimize::optimizer::{optimize_cv, OptimizeRequest, OptimizeStats};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub success: bool,
    pub optimized_cv: String,
    pub stats: OptimizeStats,
}

/// POST /api/v1/optimize
///
/// Rewrites a pasted CV, optionally tailored to a job posting. Long CVs are
/// processed chunk by chunk; chunks the LLM fails on keep a rule-based rewrite.
pub async fn handle_optimize(
    State(state): State<AppState>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, AppError> {
    let outcome = optimize_cv(state.rewriter.as_ref(), &request, &state.config.optimize).await?;

    Ok(Json(OptimizeResponse {
        success: true,
        optimized_cv: outcome.optimized_cv,
        stats: outcome.stats,
    }))
}

//! HTTP handlers for the bullet-improvement pipeline.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::pipeline::orchestrator::{
    reimprove_bullet, run_pipeline, ImprovedBullet, ReimproveRequest, ReimprovedBullet,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub bullets: Vec<ImprovedBullet>,
    pub notes: String,
}

/// POST /api/v1/analyze — runs the full pipeline for one (resume, JD) pair.
///
/// An empty or bullet-free resume is not an error: it yields an empty list.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    info!(
        resume_chars = request.resume_text.len(),
        jd_chars = request.job_description.len(),
        "Analyze request received"
    );

    let bullets = run_pipeline(
        Arc::clone(&state.llm),
        Arc::clone(&state.relevance_scorer),
        &request.resume_text,
        &request.job_description,
    )
    .await?;

    let notes = format!(
        "Processed {} bullets through the extract, map, improve, and self-critique pipeline.",
        bullets.len()
    );

    Ok(Json(AnalyzeResponse { bullets, notes }))
}

/// POST /api/v1/improve-bullet — one fresh re-improve attempt for a single
/// low-relevance bullet. Stateless; the caller decides when to stop retrying.
pub async fn handle_improve_bullet(
    State(state): State<AppState>,
    Json(request): Json<ReimproveRequest>,
) -> Result<Json<ReimprovedBullet>, AppError> {
    info!(
        current_relevance = request.current_relevance,
        target_relevance = request.target_relevance,
        "Re-improve request received"
    );

    let result = reimprove_bullet(
        state.llm.as_ref(),
        state.relevance_scorer.as_ref(),
        &request,
    )
    .await?;

    Ok(Json(result))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

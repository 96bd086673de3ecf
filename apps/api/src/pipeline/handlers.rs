use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::JobView;
use crate::errors::AppError;
use crate::models::application::{
    ApplicationRow, ApplicationScoreRow, ApplicationStatus, NewApplicationScore,
};
use crate::models::job_offer::{JobOfferRow, NewJobOffer, PipelineStageRow};
use crate::pipeline::applications::{add_score, advance_stage, list_scores, set_status};
use crate::pipeline::jobs::{create_job_offer, toggle_job_status};
use crate::pipeline::rounds::{replace_rounds, RoundInput};
use crate::state::AppState;

/// GET /api/v1/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Json<Vec<JobView>> {
    Json(state.cache.snapshot().await.jobs.clone())
}

#[derive(Serialize)]
pub struct CreatedJob {
    #[serde(flatten)]
    pub offer: JobOfferRow,
    pub rounds: Vec<PipelineStageRow>,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<NewJobOffer>,
) -> Result<(StatusCode, Json<CreatedJob>), AppError> {
    let (offer, rounds) = create_job_offer(state.store.as_ref(), &req).await?;
    state.refresh_cache().await;
    Ok((StatusCode::CREATED, Json(CreatedJob { offer, rounds })))
}

/// PATCH /api/v1/jobs/:id/status
pub async fn handle_toggle_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobOfferRow>, AppError> {
    let job = toggle_job_status(state.store.as_ref(), id).await?;
    state.refresh_cache().await;
    Ok(Json(job))
}

#[derive(Deserialize)]
pub struct RoundsUpdate {
    pub rounds: Vec<RoundInput>,
}

/// PUT /api/v1/jobs/:id/rounds
pub async fn handle_replace_rounds(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RoundsUpdate>,
) -> Result<Json<Vec<PipelineStageRow>>, AppError> {
    let rounds = replace_rounds(state.store.as_ref(), id, &req.rounds).await?;
    state.refresh_cache().await;
    Ok(Json(rounds))
}

#[derive(Deserialize)]
pub struct StageMove {
    pub stage_id: Uuid,
}

/// PATCH /api/v1/applications/:id/stage
pub async fn handle_advance_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StageMove>,
) -> Result<Json<ApplicationRow>, AppError> {
    let application = advance_stage(state.store.as_ref(), id, req.stage_id).await?;
    state.refresh_cache().await;
    Ok(Json(application))
}

#[derive(Deserialize)]
pub struct StatusChange {
    pub status: ApplicationStatus,
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusChange>,
) -> Result<Json<ApplicationRow>, AppError> {
    let application = set_status(state.store.as_ref(), id, req.status).await?;
    state.refresh_cache().await;
    Ok(Json(application))
}

/// GET /api/v1/applications/:id/scores
pub async fn handle_list_scores(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ApplicationScoreRow>>, AppError> {
    Ok(Json(list_scores(state.store.as_ref(), id).await?))
}

/// POST /api/v1/applications/:id/scores
pub async fn handle_add_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<NewApplicationScore>,
) -> Result<(StatusCode, Json<ApplicationScoreRow>), AppError> {
    let score = add_score(state.store.as_ref(), id, &req).await?;
    Ok((StatusCode::CREATED, Json(score)))
}

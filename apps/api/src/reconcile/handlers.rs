use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::CandidateView;
use crate::enrichment::ResumeFile;
use crate::errors::AppError;
use crate::models::candidate::{CandidateRow, CandidateSource};
use crate::models::resume::ResumeRow;
use crate::reconcile::bulk::{BulkEnrichment, BulkSummary};
use crate::reconcile::enrich::{enrich_resume, update_profile_url, EnrichMode};
use crate::reconcile::ingest::{ingest_batch, BatchSummary};
use crate::state::AppState;

/// GET /api/v1/candidates
pub async fn handle_list_candidates(State(state): State<AppState>) -> Json<Vec<CandidateView>> {
    Json(state.cache.snapshot().await.candidates.clone())
}

/// POST /api/v1/candidates/upload
///
/// Multipart form: one or more `file` parts, an optional `job_offer_id` and an
/// optional free-form `source` label.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchSummary>, AppError> {
    let mut files = Vec::new();
    let mut job_offer_id = None;
    let mut source = CandidateSource::FileUpload;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field.content_type().map(String::from);
                let bytes: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
                files.push(ResumeFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some("job_offer_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
                if !raw.trim().is_empty() {
                    job_offer_id = Some(Uuid::parse_str(raw.trim()).map_err(|_| {
                        AppError::Validation(format!("Invalid job_offer_id '{raw}'"))
                    })?);
                }
            }
            Some("source") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
                source = CandidateSource::normalize(&raw);
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(AppError::Validation("No resume file in upload".to_string()));
    }

    let summary = ingest_batch(
        state.store.as_ref(),
        state.enrichment.as_ref(),
        job_offer_id,
        &files,
        source,
    )
    .await;
    if !summary.succeeded.is_empty() {
        state.refresh_cache().await;
    }
    Ok(Json(summary))
}

#[derive(Deserialize)]
pub struct ProfileUrlUpdate {
    pub linkedin_url: String,
}

/// PATCH /api/v1/candidates/:id/linkedin
pub async fn handle_update_profile_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProfileUrlUpdate>,
) -> Result<Json<CandidateRow>, AppError> {
    let candidate = update_profile_url(state.store.as_ref(), id, &req.linkedin_url).await?;
    state.refresh_cache().await;
    Ok(Json(candidate))
}

#[derive(Debug, Default, Deserialize)]
pub struct EnrichRequest {
    #[serde(default)]
    pub mode: EnrichMode,
}

/// POST /api/v1/resumes/:id/enrich
pub async fn handle_enrich(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<EnrichRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let row = enrich_resume(state.store.as_ref(), state.enrichment.as_ref(), id, req.mode).await?;
    state.refresh_cache().await;
    Ok(Json(row))
}

/// POST /api/v1/resumes/enrich-bulk
pub async fn handle_enrich_bulk(
    State(state): State<AppState>,
    Json(req): Json<EnrichRequest>,
) -> Result<Json<BulkSummary>, AppError> {
    let bulk = BulkEnrichment::new(
        state.store.clone(),
        state.enrichment.clone(),
        state.cache.clone(),
        state.config.bulk_enrich_delay,
    )
    .with_mode(req.mode);
    let summary = bulk
        .run(
            |current, total| tracing::info!(current, total, "Bulk enrichment progress"),
            None,
        )
        .await?;
    Ok(Json(summary))
}

#[derive(Serialize)]
pub struct LakeEntry {
    #[serde(flatten)]
    pub resume: ResumeRow,
    pub candidate: Option<CandidateRow>,
    /// Publicly fetchable location of the stored file.
    pub public_file_url: Option<String>,
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<LakeEntry>>, AppError> {
    let resumes = state.store.list_resumes().await.map_err(AppError::storage)?;
    let candidates = state.store.list_candidates().await.map_err(AppError::storage)?;

    let entries = resumes
        .into_iter()
        .map(|resume| LakeEntry {
            candidate: resume
                .candidate_id
                .and_then(|id| candidates.iter().find(|c| c.id == id).cloned()),
            public_file_url: resume
                .file_url
                .as_deref()
                .and_then(|f| state.storage.public_url(f)),
            resume,
        })
        .collect();
    Ok(Json(entries))
}

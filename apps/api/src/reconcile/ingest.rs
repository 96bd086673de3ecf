//! Upload orchestration: parse, discover a profile URL, resolve the candidate,
//! store the resume and open an application on the job's first round.
//!
//! The writes are not transactional. When a step after a creation fails, the rows
//! this call created are soft-deleted again so no orphan is left behind.

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::enrichment::{EnrichmentService, ProfileQuery, ResumeFile};
use crate::errors::AppError;
use crate::models::application::{ApplicationStatus, NewApplication};
use crate::models::candidate::CandidateSource;
use crate::models::resume::NewResume;
use crate::models::resume_data::ResumeData;
use crate::reconcile::identity::resolve_candidate;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub candidate_id: Uuid,
    pub candidate_created: bool,
    pub resume_id: Uuid,
    pub application_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<IngestOutcome>,
    pub failed: Vec<IngestFailure>,
}

/// Parses `file` and ingests it for `job_offer_id` (if any).
pub async fn ingest_resume(
    store: &dyn Store,
    enrichment: &dyn EnrichmentService,
    job_offer_id: Option<Uuid>,
    file: &ResumeFile,
    source: CandidateSource,
) -> Result<IngestOutcome, AppError> {
    let mut data = enrichment.parse_resume(file).await.map_err(AppError::parse)?;
    if !data.has_name() {
        return Err(AppError::Parse(format!(
            "no candidate name found in {}",
            file.file_name
        )));
    }

    if data.linkedin_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
        let query = ProfileQuery {
            name: data.name.clone(),
            company: data.current_company().map(String::from),
            location: data.location.clone(),
        };
        data.linkedin_url = enrichment.find_profile_url(&query).await;
    }

    ingest_parsed(store, job_offer_id, &data, source).await
}

/// Stores an already parsed resume: candidate, resume, then application.
pub async fn ingest_parsed(
    store: &dyn Store,
    job_offer_id: Option<Uuid>,
    data: &ResumeData,
    source: CandidateSource,
) -> Result<IngestOutcome, AppError> {
    // Resolve the target round before writing anything.
    let first_stage = match job_offer_id {
        Some(job_id) => {
            store
                .get_job_offer(job_id)
                .await
                .map_err(AppError::storage)?
                .ok_or_else(|| AppError::NotFound(format!("job offer {job_id} not found")))?;
            let stages = store.list_stages(job_id).await.map_err(AppError::storage)?;
            Some((job_id, stages.first().map(|s| s.id)))
        }
        None => None,
    };

    let resolved = resolve_candidate(store, data, source).await?;
    let created_candidate = resolved.created.then_some(resolved.candidate_id);

    let parsed_data = match data.to_value() {
        Ok(value) => value,
        Err(e) => {
            compensate(store, created_candidate, None).await;
            return Err(AppError::Internal(e.into()));
        }
    };

    let resume = match store
        .insert_resume(&NewResume {
            candidate_id: resolved.candidate_id,
            parsed_data,
            file_url: None,
            source,
            enriched: false,
        })
        .await
    {
        Ok(row) => row,
        Err(e) => {
            error!(candidate_id = %resolved.candidate_id, error = %e, "Failed to store resume");
            compensate(store, created_candidate, None).await;
            return Err(AppError::storage(e));
        }
    };

    let mut application_id = None;
    if let Some((job_id, stage_id)) = first_stage {
        if stage_id.is_none() {
            warn!(job_offer_id = %job_id, "Job has no rounds, application starts without a stage");
        }
        match store
            .insert_application(&NewApplication {
                job_offer_id: job_id,
                candidate_id: resolved.candidate_id,
                resume_id: Some(resume.id),
                current_stage_id: stage_id,
                status: ApplicationStatus::Applied,
            })
            .await
        {
            Ok(row) => application_id = Some(row.id),
            Err(e) => {
                error!(
                    job_offer_id = %job_id,
                    candidate_id = %resolved.candidate_id,
                    error = %e,
                    "Failed to create application"
                );
                compensate(store, created_candidate, Some(resume.id)).await;
                return Err(AppError::storage(e));
            }
        }
    }

    info!(
        candidate_id = %resolved.candidate_id,
        resume_id = %resume.id,
        created = resolved.created,
        "Ingested resume"
    );
    Ok(IngestOutcome {
        candidate_id: resolved.candidate_id,
        candidate_created: resolved.created,
        resume_id: resume.id,
        application_id,
    })
}

/// Ingests files one after the other. A failing file is reported in the summary
/// and does not affect the others.
pub async fn ingest_batch(
    store: &dyn Store,
    enrichment: &dyn EnrichmentService,
    job_offer_id: Option<Uuid>,
    files: &[ResumeFile],
    source: CandidateSource,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for file in files {
        match ingest_resume(store, enrichment, job_offer_id, file, source).await {
            Ok(outcome) => summary.succeeded.push(outcome),
            Err(e) => {
                warn!(file = %file.file_name, error = %e, "Resume upload failed");
                summary.failed.push(IngestFailure {
                    file_name: file.file_name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "Upload batch finished"
    );
    summary
}

async fn compensate(store: &dyn Store, candidate_id: Option<Uuid>, resume_id: Option<Uuid>) {
    if let Some(id) = resume_id {
        if let Err(e) = store.soft_delete_resume(id).await {
            error!(resume_id = %id, error = %e, "Compensation failed, resume left behind");
        }
    }
    if let Some(id) = candidate_id {
        if let Err(e) = store.soft_delete_candidate(id).await {
            error!(candidate_id = %id, error = %e, "Compensation failed, candidate left behind");
        }
    }
}

use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job_offer::{JobOfferRow, JobStatus, NewJobOffer, PipelineStageRow};
use crate::pipeline::rounds::DEFAULT_ROUNDS;
use crate::store::Store;

/// Creates an open job offer with the default rounds.
pub async fn create_job_offer(
    store: &dyn Store,
    offer: &NewJobOffer,
) -> Result<(JobOfferRow, Vec<PipelineStageRow>), AppError> {
    if offer.title.trim().is_empty() {
        return Err(AppError::Validation("Job title must not be empty".to_string()));
    }

    let job = store
        .insert_job_offer(offer, JobStatus::Open)
        .await
        .map_err(AppError::storage)?;

    let mut rounds = Vec::with_capacity(DEFAULT_ROUNDS.len());
    for (idx, name) in DEFAULT_ROUNDS.iter().enumerate() {
        let round = store
            .insert_stage(job.id, name, idx as i32 + 1)
            .await
            .map_err(|e| {
                error!(job_offer_id = %job.id, error = %e, "Failed to seed default rounds");
                AppError::storage(e)
            })?;
        rounds.push(round);
    }

    info!(job_offer_id = %job.id, "Job offer created");
    Ok((job, rounds))
}

/// Flips open and closed; a draft opens.
pub async fn toggle_job_status(store: &dyn Store, id: Uuid) -> Result<JobOfferRow, AppError> {
    let job = store
        .get_job_offer(id)
        .await
        .map_err(AppError::storage)?
        .ok_or_else(|| AppError::NotFound(format!("job offer {id} not found")))?;

    let next = job.status.toggled();
    store
        .update_job_offer_status(id, next)
        .await
        .map_err(AppError::storage)?;
    info!(job_offer_id = %id, status = next.as_str(), "Job status toggled");

    Ok(JobOfferRow { status: next, ..job })
}

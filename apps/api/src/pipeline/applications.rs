//! Application moves through a job's pipeline, plus score bookkeeping.

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{
    ApplicationRow, ApplicationScoreRow, ApplicationStatus, NewApplicationScore,
};
use crate::store::Store;

async fn load(store: &dyn Store, id: Uuid) -> Result<ApplicationRow, AppError> {
    store
        .get_application(id)
        .await
        .map_err(AppError::storage)?
        .ok_or_else(|| AppError::NotFound(format!("application {id} not found")))
}

/// Moves an application to `stage_id`, which must be a round of the same job.
pub async fn advance_stage(
    store: &dyn Store,
    application_id: Uuid,
    stage_id: Uuid,
) -> Result<ApplicationRow, AppError> {
    let application = load(store, application_id).await?;
    let stage = store
        .get_stage(stage_id)
        .await
        .map_err(AppError::storage)?
        .ok_or_else(|| AppError::NotFound(format!("pipeline stage {stage_id} not found")))?;

    if stage.job_offer_id != application.job_offer_id {
        return Err(AppError::Validation(format!(
            "stage {stage_id} belongs to another job offer"
        )));
    }
    if application.status.is_terminal() {
        warn!(
            application_id = %application_id,
            status = application.status.as_str(),
            "Moving an application that is already closed"
        );
    }

    store
        .update_application_stage(application_id, stage_id)
        .await
        .map_err(AppError::storage)?;
    info!(application_id = %application_id, stage_id = %stage_id, "Application moved");
    load(store, application_id).await
}

/// Sets the status directly. Unusual transitions are allowed and logged.
pub async fn set_status(
    store: &dyn Store,
    application_id: Uuid,
    status: ApplicationStatus,
) -> Result<ApplicationRow, AppError> {
    let application = load(store, application_id).await?;
    if !application.status.is_conventional_transition(status) {
        warn!(
            application_id = %application_id,
            from = application.status.as_str(),
            to = status.as_str(),
            "Unconventional status transition"
        );
    }

    store
        .update_application_status(application_id, status)
        .await
        .map_err(AppError::storage)?;
    info!(application_id = %application_id, status = status.as_str(), "Application status set");
    load(store, application_id).await
}

pub async fn add_score(
    store: &dyn Store,
    application_id: Uuid,
    score: &NewApplicationScore,
) -> Result<ApplicationScoreRow, AppError> {
    if score.score_type.trim().is_empty() {
        return Err(AppError::Validation("score_type must not be empty".to_string()));
    }
    if !score.score_value.is_finite() {
        return Err(AppError::Validation("score_value must be a finite number".to_string()));
    }
    load(store, application_id).await?;
    store
        .insert_score(application_id, score)
        .await
        .map_err(AppError::storage)
}

pub async fn list_scores(
    store: &dyn Store,
    application_id: Uuid,
) -> Result<Vec<ApplicationScoreRow>, AppError> {
    load(store, application_id).await?;
    store.list_scores(application_id).await.map_err(AppError::storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::NewApplication;
    use crate::models::candidate::{CandidateSource, NewCandidate};
    use crate::models::job_offer::PipelineStageRow;
    use crate::store::MemoryStore;
    use crate::testing::seeded_job;

    async fn apply(store: &MemoryStore, stages: &[PipelineStageRow]) -> ApplicationRow {
        let candidate = store
            .insert_candidate(&NewCandidate {
                full_name: "Jane Doe".to_string(),
                email: None,
                phone: None,
                location: None,
                linkedin_url: None,
                source: CandidateSource::FileUpload,
            })
            .await
            .unwrap();
        store
            .insert_application(&NewApplication {
                job_offer_id: stages[0].job_offer_id,
                candidate_id: candidate.id,
                resume_id: None,
                current_stage_id: Some(stages[0].id),
                status: ApplicationStatus::Applied,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_advance_within_job() {
        let store = MemoryStore::new();
        let (_, stages) = seeded_job(&store, &["Applied", "Interview"]).await;
        let application = apply(&store, &stages).await;

        let moved = advance_stage(&store, application.id, stages[1].id).await.unwrap();
        assert_eq!(moved.current_stage_id, Some(stages[1].id));
    }

    #[tokio::test]
    async fn test_cross_job_move_is_rejected() {
        let store = MemoryStore::new();
        let (_, stages) = seeded_job(&store, &["Applied"]).await;
        let (_, other) = seeded_job(&store, &["Applied"]).await;
        let application = apply(&store, &stages).await;

        let err = advance_stage(&store, application.id, other[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let unchanged = store.get_application(application.id).await.unwrap().unwrap();
        assert_eq!(unchanged.current_stage_id, Some(stages[0].id));
    }

    #[tokio::test]
    async fn test_status_is_set_even_after_decline() {
        let store = MemoryStore::new();
        let (_, stages) = seeded_job(&store, &["Applied"]).await;
        let application = apply(&store, &stages).await;

        set_status(&store, application.id, ApplicationStatus::Declined).await.unwrap();
        let reopened = set_status(&store, application.id, ApplicationStatus::Shortlisted)
            .await
            .unwrap();
        assert_eq!(reopened.status, ApplicationStatus::Shortlisted);
    }

    #[tokio::test]
    async fn test_scores() {
        let store = MemoryStore::new();
        let (_, stages) = seeded_job(&store, &["Applied"]).await;
        let application = apply(&store, &stages).await;

        let score = NewApplicationScore {
            score_type: "fit".to_string(),
            score_value: 0.8,
            explanation: None,
        };
        add_score(&store, application.id, &score).await.unwrap();
        assert_eq!(list_scores(&store, application.id).await.unwrap().len(), 1);

        let bad = NewApplicationScore {
            score_value: f64::NAN,
            ..score
        };
        assert!(matches!(
            add_score(&store, application.id, &bad).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            list_scores(&store, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}

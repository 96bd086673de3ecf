//! Persistence seam: the record store every domain module talks to.
//!
//! `PgStore` is the production backend; `MemoryStore` mirrors its constraints
//! in-process for development mode and tests. Both enforce:
//! - at most one live candidate per non-empty email,
//! - unique `stage_order` per job at every committed write,
//! - soft delete (`deleted_at`) for everything except pipeline stages.
//!
//! `AppState` holds an `Arc<dyn Store>`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::application::{
    ApplicationRow, ApplicationScoreRow, ApplicationStatus, NewApplication, NewApplicationScore,
};
use crate::models::candidate::{CandidatePatch, CandidateRow, NewCandidate};
use crate::models::job_offer::{JobOfferRow, JobStatus, NewJobOffer, PipelineStageRow};
use crate::models::resume::{NewResume, ResumeRow};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or reference constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        StoreError::NotFound { entity, id }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint(_))
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // ── Job offers ──────────────────────────────────────────────────────────

    /// Live job offers, newest first.
    async fn list_job_offers(&self) -> Result<Vec<JobOfferRow>, StoreError>;

    async fn get_job_offer(&self, id: Uuid) -> Result<Option<JobOfferRow>, StoreError>;

    async fn insert_job_offer(
        &self,
        offer: &NewJobOffer,
        status: JobStatus,
    ) -> Result<JobOfferRow, StoreError>;

    async fn update_job_offer_status(&self, id: Uuid, status: JobStatus)
        -> Result<(), StoreError>;

    // ── Pipeline stages ─────────────────────────────────────────────────────

    /// Stages of a job ordered by `stage_order` ascending.
    async fn list_stages(&self, job_offer_id: Uuid) -> Result<Vec<PipelineStageRow>, StoreError>;

    async fn get_stage(&self, id: Uuid) -> Result<Option<PipelineStageRow>, StoreError>;

    async fn insert_stage(
        &self,
        job_offer_id: Uuid,
        name: &str,
        stage_order: i32,
    ) -> Result<PipelineStageRow, StoreError>;

    /// Single-row write. Fails with `Constraint` if `stage_order` is already
    /// taken by another stage of the same job.
    async fn update_stage(&self, id: Uuid, name: &str, stage_order: i32)
        -> Result<(), StoreError>;

    /// Hard delete. Applications pointing at a deleted stage lose their stage.
    async fn delete_stages(&self, ids: &[Uuid]) -> Result<(), StoreError>;

    // ── Candidates ──────────────────────────────────────────────────────────

    /// Exact, case-sensitive match among live candidates.
    async fn find_candidate_by_email(&self, email: &str)
        -> Result<Option<CandidateRow>, StoreError>;

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateRow>, StoreError>;

    async fn list_candidates(&self) -> Result<Vec<CandidateRow>, StoreError>;

    async fn insert_candidate(&self, candidate: &NewCandidate)
        -> Result<CandidateRow, StoreError>;

    async fn update_candidate(
        &self,
        id: Uuid,
        patch: &CandidatePatch,
    ) -> Result<CandidateRow, StoreError>;

    async fn soft_delete_candidate(&self, id: Uuid) -> Result<(), StoreError>;

    // ── Resumes ─────────────────────────────────────────────────────────────

    async fn insert_resume(&self, resume: &NewResume) -> Result<ResumeRow, StoreError>;

    async fn get_resume(&self, id: Uuid) -> Result<Option<ResumeRow>, StoreError>;

    /// Live resumes, newest first.
    async fn list_resumes(&self) -> Result<Vec<ResumeRow>, StoreError>;

    /// Writes `parsed_data` and ORs `enriched` into the stored flag in one
    /// statement, so the flag can never go back to false.
    async fn update_resume_data(
        &self,
        id: Uuid,
        parsed_data: &Value,
        enriched: bool,
    ) -> Result<ResumeRow, StoreError>;

    async fn soft_delete_resume(&self, id: Uuid) -> Result<(), StoreError>;

    // ── Applications ────────────────────────────────────────────────────────

    async fn insert_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationRow, StoreError>;

    async fn get_application(&self, id: Uuid) -> Result<Option<ApplicationRow>, StoreError>;

    /// Live applications, most recent first.
    async fn list_applications(&self) -> Result<Vec<ApplicationRow>, StoreError>;

    /// Live applications whose current stage is one of `stage_ids`.
    async fn applications_at_stages(
        &self,
        stage_ids: &[Uuid],
    ) -> Result<Vec<ApplicationRow>, StoreError>;

    async fn update_application_stage(&self, id: Uuid, stage_id: Uuid)
        -> Result<(), StoreError>;

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<(), StoreError>;

    // ── Scores ──────────────────────────────────────────────────────────────

    async fn insert_score(
        &self,
        application_id: Uuid,
        score: &NewApplicationScore,
    ) -> Result<ApplicationScoreRow, StoreError>;

    async fn list_scores(&self, application_id: Uuid)
        -> Result<Vec<ApplicationScoreRow>, StoreError>;
}

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::application::{
    ApplicationRow, ApplicationScoreRow, ApplicationStatus, NewApplication, NewApplicationScore,
};
use crate::models::candidate::{CandidatePatch, CandidateRow, NewCandidate};
use crate::models::job_offer::{JobOfferRow, JobStatus, NewJobOffer, PipelineStageRow};
use crate::models::resume::{NewResume, ResumeRow};
use crate::store::{Store, StoreError};

/// Postgres-backed store. Constraints live in the schema (see `migrations/`).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Lifts constraint failures out of the generic database error.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() {
            return StoreError::Constraint(db.message().to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn list_job_offers(&self) -> Result<Vec<JobOfferRow>, StoreError> {
        sqlx::query_as::<_, JobOfferRow>(
            "SELECT * FROM job_offers WHERE deleted_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_job_offer(&self, id: Uuid) -> Result<Option<JobOfferRow>, StoreError> {
        sqlx::query_as::<_, JobOfferRow>(
            "SELECT * FROM job_offers WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn insert_job_offer(
        &self,
        offer: &NewJobOffer,
        status: JobStatus,
    ) -> Result<JobOfferRow, StoreError> {
        sqlx::query_as::<_, JobOfferRow>(
            r#"
            INSERT INTO job_offers (title, description, status, skills)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(status.as_str())
        .bind(&offer.skills)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_job_offer_status(
        &self,
        id: Uuid,
        status: JobStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE job_offers SET status = $1 WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("job offer", id));
        }
        Ok(())
    }

    async fn list_stages(&self, job_offer_id: Uuid) -> Result<Vec<PipelineStageRow>, StoreError> {
        sqlx::query_as::<_, PipelineStageRow>(
            "SELECT * FROM pipeline_stages WHERE job_offer_id = $1 ORDER BY stage_order ASC",
        )
        .bind(job_offer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_stage(&self, id: Uuid) -> Result<Option<PipelineStageRow>, StoreError> {
        sqlx::query_as::<_, PipelineStageRow>("SELECT * FROM pipeline_stages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn insert_stage(
        &self,
        job_offer_id: Uuid,
        name: &str,
        stage_order: i32,
    ) -> Result<PipelineStageRow, StoreError> {
        sqlx::query_as::<_, PipelineStageRow>(
            r#"
            INSERT INTO pipeline_stages (job_offer_id, name, stage_order)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(job_offer_id)
        .bind(name)
        .bind(stage_order)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_stage(
        &self,
        id: Uuid,
        name: &str,
        stage_order: i32,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE pipeline_stages SET name = $1, stage_order = $2 WHERE id = $3")
                .bind(name)
                .bind(stage_order)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("pipeline stage", id));
        }
        Ok(())
    }

    async fn delete_stages(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("DELETE FROM pipeline_stages WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn find_candidate_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CandidateRow>, StoreError> {
        sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates WHERE email = $1 AND deleted_at IS NULL LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateRow>, StoreError> {
        sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn list_candidates(&self) -> Result<Vec<CandidateRow>, StoreError> {
        sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates WHERE deleted_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn insert_candidate(
        &self,
        candidate: &NewCandidate,
    ) -> Result<CandidateRow, StoreError> {
        sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates (full_name, email, phone, location, linkedin_url, source)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&candidate.full_name)
        .bind(&candidate.email)
        .bind(&candidate.phone)
        .bind(&candidate.location)
        .bind(&candidate.linkedin_url)
        .bind(candidate.source.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_candidate(
        &self,
        id: Uuid,
        patch: &CandidatePatch,
    ) -> Result<CandidateRow, StoreError> {
        sqlx::query_as::<_, CandidateRow>(
            r#"
            UPDATE candidates
            SET phone = COALESCE($1, phone),
                location = COALESCE($2, location),
                linkedin_url = COALESCE($3, linkedin_url)
            WHERE id = $4 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(&patch.phone)
        .bind(&patch.location)
        .bind(&patch.linkedin_url)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or_else(|| StoreError::not_found("candidate", id))
    }

    async fn soft_delete_candidate(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE candidates SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn insert_resume(&self, resume: &NewResume) -> Result<ResumeRow, StoreError> {
        sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes (candidate_id, parsed_data, file_url, source, enriched)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(resume.candidate_id)
        .bind(&resume.parsed_data)
        .bind(&resume.file_url)
        .bind(resume.source.as_str())
        .bind(resume.enriched)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_resume(&self, id: Uuid) -> Result<Option<ResumeRow>, StoreError> {
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeRow>, StoreError> {
        sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE deleted_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_resume_data(
        &self,
        id: Uuid,
        parsed_data: &Value,
        enriched: bool,
    ) -> Result<ResumeRow, StoreError> {
        sqlx::query_as::<_, ResumeRow>(
            r#"
            UPDATE resumes
            SET parsed_data = $1, enriched = enriched OR $2
            WHERE id = $3 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(parsed_data)
        .bind(enriched)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or_else(|| StoreError::not_found("resume", id))
    }

    async fn soft_delete_resume(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE resumes SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn insert_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationRow, StoreError> {
        sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications
                (job_offer_id, candidate_id, resume_id, current_stage_id, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(application.job_offer_id)
        .bind(application.candidate_id)
        .bind(application.resume_id)
        .bind(application.current_stage_id)
        .bind(application.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<ApplicationRow>, StoreError> {
        sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn list_applications(&self) -> Result<Vec<ApplicationRow>, StoreError> {
        sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications WHERE deleted_at IS NULL ORDER BY applied_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn applications_at_stages(
        &self,
        stage_ids: &[Uuid],
    ) -> Result<Vec<ApplicationRow>, StoreError> {
        if stage_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT * FROM applications
            WHERE current_stage_id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(stage_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }

    async fn update_application_stage(
        &self,
        id: Uuid,
        stage_id: Uuid,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE applications SET current_stage_id = $1, updated_at = now()
            WHERE id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(stage_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("application", id));
        }
        Ok(())
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE applications SET status = $1, updated_at = now()
            WHERE id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("application", id));
        }
        Ok(())
    }

    async fn insert_score(
        &self,
        application_id: Uuid,
        score: &NewApplicationScore,
    ) -> Result<ApplicationScoreRow, StoreError> {
        sqlx::query_as::<_, ApplicationScoreRow>(
            r#"
            INSERT INTO application_scores (application_id, score_type, score_value, explanation)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(&score.score_type)
        .bind(score.score_value)
        .bind(&score.explanation)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn list_scores(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ApplicationScoreRow>, StoreError> {
        sqlx::query_as::<_, ApplicationScoreRow>(
            "SELECT * FROM application_scores WHERE application_id = $1 ORDER BY generated_at ASC",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }
}

//! In-process `Store` with the same constraint behaviour as the Postgres schema.
//!
//! Rows live in insertion-ordered vectors behind a single mutex; no lock is held
//! across an await point.

#[cfg(test)]
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
#[cfg(test)]
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::models::application::{
    ApplicationRow, ApplicationScoreRow, ApplicationStatus, NewApplication, NewApplicationScore,
};
use crate::models::candidate::{CandidatePatch, CandidateRow, NewCandidate};
use crate::models::job_offer::{JobOfferRow, JobStatus, NewJobOffer, PipelineStageRow};
use crate::models::resume::{NewResume, ResumeRow};
use crate::store::{Store, StoreError};

#[derive(Default)]
struct Tables {
    job_offers: Vec<JobOfferRow>,
    stages: Vec<PipelineStageRow>,
    candidates: Vec<CandidateRow>,
    resumes: Vec<ResumeRow>,
    applications: Vec<ApplicationRow>,
    scores: Vec<ApplicationScoreRow>,
}

impl Tables {
    fn order_taken(&self, job_offer_id: Uuid, stage_order: i32, except: Option<Uuid>) -> bool {
        self.stages.iter().any(|s| {
            s.job_offer_id == job_offer_id
                && s.stage_order == stage_order
                && Some(s.id) != except
        })
    }

    fn live_email_taken(&self, email: &str) -> bool {
        !email.is_empty()
            && self
                .candidates
                .iter()
                .any(|c| c.deleted_at.is_none() && c.email.as_deref() == Some(email))
    }
}

fn order_violation(job_offer_id: Uuid, stage_order: i32) -> StoreError {
    StoreError::Constraint(format!(
        "duplicate stage_order {stage_order} for job offer {job_offer_id}"
    ))
}

fn missing_reference(entity: &str, id: Uuid) -> StoreError {
    StoreError::Constraint(format!("referenced {entity} {id} does not exist"))
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    #[cfg(test)]
    failing: Mutex<HashSet<&'static str>>,
    #[cfg(test)]
    holds: Mutex<HashMap<&'static str, Hold>>,
}

#[cfg(test)]
struct Hold {
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every subsequent call of the named operation fail.
    #[cfg(test)]
    pub fn fail_on(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    #[cfg(test)]
    fn check(&self, operation: &'static str) -> Result<(), StoreError> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(operation) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "injected failure in {operation}"
            ))));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check(&self, _operation: &'static str) -> Result<(), StoreError> {
        Ok(())
    }

    /// Suspends the next call of the named operation after it has read its rows.
    /// Returns a receiver that fires once the call is suspended and a sender
    /// that lets it return.
    #[cfg(test)]
    pub fn hold_once(
        &self,
        operation: &'static str,
    ) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.holds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                operation,
                Hold {
                    reached: reached_tx,
                    release: release_rx,
                },
            );
        (reached_rx, release_tx)
    }

    #[cfg(test)]
    async fn pause_point(&self, operation: &'static str) {
        let hold = self
            .holds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(operation);
        if let Some(hold) = hold {
            let _ = hold.reached.send(());
            let _ = hold.release.await;
        }
    }

    #[cfg(not(test))]
    async fn pause_point(&self, _operation: &'static str) {}
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_job_offers(&self) -> Result<Vec<JobOfferRow>, StoreError> {
        self.check("list_job_offers")?;
        let offers: Vec<JobOfferRow> = self
            .lock()
            .job_offers
            .iter()
            .rev()
            .filter(|j| j.deleted_at.is_none())
            .cloned()
            .collect();
        self.pause_point("list_job_offers").await;
        Ok(offers)
    }

    async fn get_job_offer(&self, id: Uuid) -> Result<Option<JobOfferRow>, StoreError> {
        let tables = self.lock();
        Ok(tables
            .job_offers
            .iter()
            .find(|j| j.id == id && j.deleted_at.is_none())
            .cloned())
    }

    async fn insert_job_offer(
        &self,
        offer: &NewJobOffer,
        status: JobStatus,
    ) -> Result<JobOfferRow, StoreError> {
        self.check("insert_job_offer")?;
        let row = JobOfferRow {
            id: Uuid::new_v4(),
            title: offer.title.clone(),
            description: offer.description.clone(),
            status,
            skills: offer.skills.clone(),
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.lock().job_offers.push(row.clone());
        Ok(row)
    }

    async fn update_job_offer_status(
        &self,
        id: Uuid,
        status: JobStatus,
    ) -> Result<(), StoreError> {
        self.check("update_job_offer_status")?;
        let mut tables = self.lock();
        let job = tables
            .job_offers
            .iter_mut()
            .find(|j| j.id == id && j.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("job offer", id))?;
        job.status = status;
        Ok(())
    }

    async fn list_stages(&self, job_offer_id: Uuid) -> Result<Vec<PipelineStageRow>, StoreError> {
        let tables = self.lock();
        let mut stages: Vec<PipelineStageRow> = tables
            .stages
            .iter()
            .filter(|s| s.job_offer_id == job_offer_id)
            .cloned()
            .collect();
        stages.sort_by_key(|s| s.stage_order);
        Ok(stages)
    }

    async fn get_stage(&self, id: Uuid) -> Result<Option<PipelineStageRow>, StoreError> {
        Ok(self.lock().stages.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_stage(
        &self,
        job_offer_id: Uuid,
        name: &str,
        stage_order: i32,
    ) -> Result<PipelineStageRow, StoreError> {
        self.check("insert_stage")?;
        let mut tables = self.lock();
        if !tables.job_offers.iter().any(|j| j.id == job_offer_id) {
            return Err(missing_reference("job offer", job_offer_id));
        }
        if tables.order_taken(job_offer_id, stage_order, None) {
            return Err(order_violation(job_offer_id, stage_order));
        }
        let row = PipelineStageRow {
            id: Uuid::new_v4(),
            job_offer_id,
            name: name.to_string(),
            stage_order,
            created_at: Utc::now(),
        };
        tables.stages.push(row.clone());
        Ok(row)
    }

    async fn update_stage(
        &self,
        id: Uuid,
        name: &str,
        stage_order: i32,
    ) -> Result<(), StoreError> {
        self.check("update_stage")?;
        let mut tables = self.lock();
        let job_offer_id = tables
            .stages
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.job_offer_id)
            .ok_or_else(|| StoreError::not_found("pipeline stage", id))?;
        if tables.order_taken(job_offer_id, stage_order, Some(id)) {
            return Err(order_violation(job_offer_id, stage_order));
        }
        if let Some(stage) = tables.stages.iter_mut().find(|s| s.id == id) {
            stage.name = name.to_string();
            stage.stage_order = stage_order;
        }
        Ok(())
    }

    async fn delete_stages(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        self.check("delete_stages")?;
        let doomed: HashSet<Uuid> = ids.iter().copied().collect();
        let mut tables = self.lock();
        tables.stages.retain(|s| !doomed.contains(&s.id));
        for application in tables.applications.iter_mut() {
            if application
                .current_stage_id
                .is_some_and(|stage| doomed.contains(&stage))
            {
                application.current_stage_id = None;
            }
        }
        Ok(())
    }

    async fn find_candidate_by_email(
        &self,
        email: &str,
    ) -> Result<Option<CandidateRow>, StoreError> {
        self.check("find_candidate_by_email")?;
        Ok(self
            .lock()
            .candidates
            .iter()
            .find(|c| c.deleted_at.is_none() && c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateRow>, StoreError> {
        Ok(self
            .lock()
            .candidates
            .iter()
            .find(|c| c.id == id && c.deleted_at.is_none())
            .cloned())
    }

    async fn list_candidates(&self) -> Result<Vec<CandidateRow>, StoreError> {
        Ok(self
            .lock()
            .candidates
            .iter()
            .rev()
            .filter(|c| c.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn insert_candidate(
        &self,
        candidate: &NewCandidate,
    ) -> Result<CandidateRow, StoreError> {
        self.check("insert_candidate")?;
        let mut tables = self.lock();
        if let Some(email) = candidate.email.as_deref() {
            if tables.live_email_taken(email) {
                return Err(StoreError::Constraint(format!(
                    "a live candidate with email '{email}' already exists"
                )));
            }
        }
        let row = CandidateRow {
            id: Uuid::new_v4(),
            full_name: candidate.full_name.clone(),
            email: candidate.email.clone(),
            phone: candidate.phone.clone(),
            location: candidate.location.clone(),
            linkedin_url: candidate.linkedin_url.clone(),
            source: candidate.source,
            created_at: Utc::now(),
            deleted_at: None,
        };
        tables.candidates.push(row.clone());
        Ok(row)
    }

    async fn update_candidate(
        &self,
        id: Uuid,
        patch: &CandidatePatch,
    ) -> Result<CandidateRow, StoreError> {
        self.check("update_candidate")?;
        let mut tables = self.lock();
        let candidate = tables
            .candidates
            .iter_mut()
            .find(|c| c.id == id && c.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("candidate", id))?;
        if let Some(phone) = &patch.phone {
            candidate.phone = Some(phone.clone());
        }
        if let Some(location) = &patch.location {
            candidate.location = Some(location.clone());
        }
        if let Some(url) = &patch.linkedin_url {
            candidate.linkedin_url = Some(url.clone());
        }
        Ok(candidate.clone())
    }

    async fn soft_delete_candidate(&self, id: Uuid) -> Result<(), StoreError> {
        self.check("soft_delete_candidate")?;
        let mut tables = self.lock();
        if let Some(candidate) = tables
            .candidates
            .iter_mut()
            .find(|c| c.id == id && c.deleted_at.is_none())
        {
            candidate.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn insert_resume(&self, resume: &NewResume) -> Result<ResumeRow, StoreError> {
        self.check("insert_resume")?;
        let mut tables = self.lock();
        if !tables.candidates.iter().any(|c| c.id == resume.candidate_id) {
            return Err(missing_reference("candidate", resume.candidate_id));
        }
        let row = ResumeRow {
            id: Uuid::new_v4(),
            candidate_id: Some(resume.candidate_id),
            parsed_data: resume.parsed_data.clone(),
            file_url: resume.file_url.clone(),
            source: resume.source,
            enriched: resume.enriched,
            created_at: Utc::now(),
            deleted_at: None,
        };
        tables.resumes.push(row.clone());
        Ok(row)
    }

    async fn get_resume(&self, id: Uuid) -> Result<Option<ResumeRow>, StoreError> {
        self.check("get_resume")?;
        Ok(self
            .lock()
            .resumes
            .iter()
            .find(|r| r.id == id && r.deleted_at.is_none())
            .cloned())
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeRow>, StoreError> {
        Ok(self
            .lock()
            .resumes
            .iter()
            .rev()
            .filter(|r| r.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update_resume_data(
        &self,
        id: Uuid,
        parsed_data: &Value,
        enriched: bool,
    ) -> Result<ResumeRow, StoreError> {
        self.check("update_resume_data")?;
        let mut tables = self.lock();
        let resume = tables
            .resumes
            .iter_mut()
            .find(|r| r.id == id && r.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("resume", id))?;
        resume.parsed_data = parsed_data.clone();
        resume.enriched = resume.enriched || enriched;
        Ok(resume.clone())
    }

    async fn soft_delete_resume(&self, id: Uuid) -> Result<(), StoreError> {
        self.check("soft_delete_resume")?;
        let mut tables = self.lock();
        if let Some(resume) = tables
            .resumes
            .iter_mut()
            .find(|r| r.id == id && r.deleted_at.is_none())
        {
            resume.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn insert_application(
        &self,
        application: &NewApplication,
    ) -> Result<ApplicationRow, StoreError> {
        self.check("insert_application")?;
        let mut tables = self.lock();
        if !tables.job_offers.iter().any(|j| j.id == application.job_offer_id) {
            return Err(missing_reference("job offer", application.job_offer_id));
        }
        if !tables.candidates.iter().any(|c| c.id == application.candidate_id) {
            return Err(missing_reference("candidate", application.candidate_id));
        }
        if let Some(resume_id) = application.resume_id {
            if !tables.resumes.iter().any(|r| r.id == resume_id) {
                return Err(missing_reference("resume", resume_id));
            }
        }
        if let Some(stage_id) = application.current_stage_id {
            if !tables.stages.iter().any(|s| s.id == stage_id) {
                return Err(missing_reference("pipeline stage", stage_id));
            }
        }
        let now = Utc::now();
        let row = ApplicationRow {
            id: Uuid::new_v4(),
            job_offer_id: application.job_offer_id,
            candidate_id: application.candidate_id,
            resume_id: application.resume_id,
            current_stage_id: application.current_stage_id,
            status: application.status,
            applied_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.applications.push(row.clone());
        Ok(row)
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<ApplicationRow>, StoreError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .find(|a| a.id == id && a.deleted_at.is_none())
            .cloned())
    }

    async fn list_applications(&self) -> Result<Vec<ApplicationRow>, StoreError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .rev()
            .filter(|a| a.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn applications_at_stages(
        &self,
        stage_ids: &[Uuid],
    ) -> Result<Vec<ApplicationRow>, StoreError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .filter(|a| {
                a.deleted_at.is_none()
                    && a.current_stage_id.is_some_and(|s| stage_ids.contains(&s))
            })
            .cloned()
            .collect())
    }

    async fn update_application_stage(
        &self,
        id: Uuid,
        stage_id: Uuid,
    ) -> Result<(), StoreError> {
        self.check("update_application_stage")?;
        let mut tables = self.lock();
        if !tables.stages.iter().any(|s| s.id == stage_id) {
            return Err(missing_reference("pipeline stage", stage_id));
        }
        let application = tables
            .applications
            .iter_mut()
            .find(|a| a.id == id && a.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("application", id))?;
        application.current_stage_id = Some(stage_id);
        application.updated_at = Utc::now();
        Ok(())
    }

    async fn update_application_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<(), StoreError> {
        self.check("update_application_status")?;
        let mut tables = self.lock();
        let application = tables
            .applications
            .iter_mut()
            .find(|a| a.id == id && a.deleted_at.is_none())
            .ok_or_else(|| StoreError::not_found("application", id))?;
        application.status = status;
        application.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_score(
        &self,
        application_id: Uuid,
        score: &NewApplicationScore,
    ) -> Result<ApplicationScoreRow, StoreError> {
        let mut tables = self.lock();
        if !tables.applications.iter().any(|a| a.id == application_id) {
            return Err(missing_reference("application", application_id));
        }
        let row = ApplicationScoreRow {
            id: Uuid::new_v4(),
            application_id,
            score_type: score.score_type.clone(),
            score_value: score.score_value,
            explanation: score.explanation.clone(),
            generated_at: Utc::now(),
        };
        tables.scores.push(row.clone());
        Ok(row)
    }

    async fn list_scores(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ApplicationScoreRow>, StoreError> {
        Ok(self
            .lock()
            .scores
            .iter()
            .filter(|s| s.application_id == application_id)
            .cloned()
            .collect())
    }
}

//! Denormalised read view of jobs and candidates.
//!
//! Readers take a cheap `Arc` snapshot; writers never patch it in place. Every
//! mutation flow ends with [`AtsCache::refresh`], which rebuilds the whole view
//! from the store. Refreshes run one at a time, so a reload that started after a
//! write is always the last one published.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::models::candidate::CandidateRow;
use crate::models::job_offer::{JobOfferRow, PipelineStageRow};
use crate::models::resume::ResumeRow;
use crate::models::resume_data::ResumeData;
use crate::store::{Store, StoreError};

/// Skills shown on a job card when the offer lists none of its own.
const DERIVED_SKILL_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub offer: JobOfferRow,
    pub rounds: Vec<PipelineStageRow>,
    /// The offer's own skills, or the most common applicant skills.
    pub skills: Vec<String>,
    pub candidate_count: usize,
}

/// One candidacy: an application joined with its candidate and resume.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    pub application_id: Uuid,
    pub job_offer_id: Uuid,
    pub candidate: CandidateRow,
    pub resume_id: Option<Uuid>,
    pub parsed_data: Option<Value>,
    pub enriched: bool,
    pub current_stage_id: Option<Uuid>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AtsSnapshot {
    pub jobs: Vec<JobView>,
    pub candidates: Vec<CandidateView>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct AtsCache {
    current: RwLock<Arc<AtsSnapshot>>,
    generation: AtomicU64,
    /// Held for a whole reload.
    reload: Mutex<()>,
}

impl AtsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<AtsSnapshot> {
        self.current.read().await.clone()
    }

    /// Number of completed refreshes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Full reload from the store. The previous snapshot stays visible until the
    /// new one is complete, and stays in place if the reload fails.
    pub async fn refresh(&self, store: &dyn Store) -> Result<Arc<AtsSnapshot>, StoreError> {
        let _reload = self.reload.lock().await;

        let offers = store.list_job_offers().await?;
        let applications = store.list_applications().await?;
        let candidates = store.list_candidates().await?;
        let resumes = store.list_resumes().await?;

        let mut rounds = HashMap::with_capacity(offers.len());
        for offer in &offers {
            rounds.insert(offer.id, store.list_stages(offer.id).await?);
        }

        let snapshot = Arc::new(build_snapshot(offers, rounds, applications, candidates, resumes));
        *self.current.write().await = snapshot.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            generation,
            jobs = snapshot.jobs.len(),
            candidates = snapshot.candidates.len(),
            "ATS cache refreshed"
        );
        Ok(snapshot)
    }
}

fn build_snapshot(
    offers: Vec<JobOfferRow>,
    mut rounds: HashMap<Uuid, Vec<PipelineStageRow>>,
    applications: Vec<ApplicationRow>,
    candidates: Vec<CandidateRow>,
    resumes: Vec<ResumeRow>,
) -> AtsSnapshot {
    let candidates_by_id: HashMap<Uuid, CandidateRow> =
        candidates.into_iter().map(|c| (c.id, c)).collect();
    let resumes_by_id: HashMap<Uuid, &ResumeRow> = resumes.iter().map(|r| (r.id, r)).collect();

    // Fallback when an application has no linked resume: the candidate's oldest one.
    let mut first_resume: HashMap<Uuid, &ResumeRow> = HashMap::new();
    for resume in &resumes {
        if let Some(owner) = resume.candidate_id {
            first_resume
                .entry(owner)
                .and_modify(|r| {
                    if resume.created_at < r.created_at {
                        *r = resume;
                    }
                })
                .or_insert(resume);
        }
    }

    let mut views = Vec::with_capacity(applications.len());
    for application in applications {
        let Some(candidate) = candidates_by_id.get(&application.candidate_id) else {
            warn!(
                application_id = %application.id,
                candidate_id = %application.candidate_id,
                "Application references a missing candidate, skipping"
            );
            continue;
        };
        let resume = application
            .resume_id
            .and_then(|id| resumes_by_id.get(&id).copied())
            .or_else(|| first_resume.get(&candidate.id).copied());

        views.push(CandidateView {
            application_id: application.id,
            job_offer_id: application.job_offer_id,
            candidate: candidate.clone(),
            resume_id: resume.map(|r| r.id),
            parsed_data: resume.map(|r| r.parsed_data.clone()),
            enriched: resume.is_some_and(|r| r.enriched),
            current_stage_id: application.current_stage_id,
            status: application.status,
            applied_at: application.applied_at,
        });
    }

    let jobs = offers
        .into_iter()
        .map(|offer| {
            let applicants: Vec<&CandidateView> =
                views.iter().filter(|v| v.job_offer_id == offer.id).collect();
            let skills = if offer.skills.is_empty() {
                top_skills(&applicants)
            } else {
                offer.skills.clone()
            };
            JobView {
                rounds: rounds.remove(&offer.id).unwrap_or_default(),
                skills,
                candidate_count: applicants.len(),
                offer,
            }
        })
        .collect();

    AtsSnapshot {
        jobs,
        candidates: views,
        refreshed_at: Some(Utc::now()),
    }
}

/// Most frequent skill names across applicants; ties broken alphabetically.
fn top_skills(applicants: &[&CandidateView]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for view in applicants {
        let Some(data) = view
            .parsed_data
            .as_ref()
            .and_then(|v| ResumeData::from_value(v).ok())
        else {
            continue;
        };
        for skill in data.skills.names() {
            *counts.entry(skill).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(DERIVED_SKILL_LIMIT)
        .map(|(skill, _)| skill)
        .collect()
}

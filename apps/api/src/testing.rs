//! Fakes and fixtures shared by the module tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::cache::AtsCache;
use crate::config::Config;
use crate::enrichment::{EnrichmentError, EnrichmentService, ProfileQuery, ResumeFile};
use crate::models::job_offer::{JobOfferRow, JobStatus, NewJobOffer, PipelineStageRow};
use crate::models::resume_data::{ProfileData, ResumeData, ResumeSnapshot};
use crate::state::AppState;
use crate::storage::StorageLocator;
use crate::store::{MemoryStore, Store};

/// Scripted stand-in for the enrichment API.
#[derive(Default)]
pub struct FakeEnrichment {
    /// Parse results keyed by uploaded file name; unknown files parse without a name.
    pub parsed: HashMap<String, ResumeData>,
    pub profile_url: Option<String>,
    pub profile: Option<ProfileData>,
    /// Candidate names whose enrich/scrape calls fail.
    pub failing_names: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEnrichment {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn fails_for(&self, name: Option<&str>) -> bool {
        name.is_some_and(|n| self.failing_names.contains(n))
    }
}

#[async_trait]
impl EnrichmentService for FakeEnrichment {
    async fn parse_resume(&self, file: &ResumeFile) -> Result<ResumeData, EnrichmentError> {
        self.record(format!("parse:{}", file.file_name));
        self.parsed
            .get(&file.file_name)
            .cloned()
            .ok_or(EnrichmentError::MissingName)
    }

    async fn find_profile_url(&self, query: &ProfileQuery) -> Option<String> {
        self.record(format!("find:{}", query.name));
        self.profile_url.clone()
    }

    async fn enrich_from_profile(
        &self,
        existing: &ResumeData,
        profile_url: Option<&str>,
        name: Option<&str>,
    ) -> Result<ResumeSnapshot, EnrichmentError> {
        self.record(format!("enrich:{}", name.unwrap_or_default()));
        if self.fails_for(name) {
            return Err(EnrichmentError::Api {
                status: 503,
                message: "scraper unavailable".to_string(),
            });
        }
        let mut enriched = existing.clone();
        enriched.linkedin_url = profile_url.map(String::from);
        enriched.accomplishments.push("Verified profile".to_string());
        Ok(ResumeSnapshot::from_data(enriched)?)
    }

    async fn scrape_profile(
        &self,
        profile_url: &str,
        name: Option<&str>,
    ) -> Result<ProfileData, EnrichmentError> {
        self.record(format!("scrape:{profile_url}"));
        if self.fails_for(name) {
            return Err(EnrichmentError::EmptyPayload);
        }
        self.profile.clone().ok_or(EnrichmentError::EmptyPayload)
    }
}

pub fn resume_data(name: &str, email: Option<&str>) -> ResumeData {
    ResumeData {
        name: name.to_string(),
        email: email.map(String::from),
        ..Default::default()
    }
}

/// Creates an open job with the given rounds, ordered 1..=n.
pub async fn seeded_job(store: &dyn Store, rounds: &[&str]) -> (JobOfferRow, Vec<PipelineStageRow>) {
    let job = store
        .insert_job_offer(
            &NewJobOffer {
                title: "Data Engineer".to_string(),
                description: "Pipelines".to_string(),
                skills: vec![],
            },
            JobStatus::Open,
        )
        .await
        .unwrap();
    let mut stages = Vec::new();
    for (idx, name) in rounds.iter().enumerate() {
        stages.push(store.insert_stage(job.id, name, idx as i32 + 1).await.unwrap());
    }
    (job, stages)
}

pub fn ids(stages: &[PipelineStageRow]) -> Vec<Uuid> {
    stages.iter().map(|s| s.id).collect()
}

/// Application state over a fresh in-process store and the given fake.
pub fn test_state(store: Arc<MemoryStore>, enrichment: Arc<FakeEnrichment>) -> AppState {
    AppState {
        store,
        enrichment,
        cache: Arc::new(AtsCache::new()),
        storage: StorageLocator::new("https://files.example.co", "Resumes_lake"),
        config: Config {
            database_url: None,
            enrichment_api_url: "http://127.0.0.1:9".to_string(),
            storage_public_url: "https://files.example.co".to_string(),
            storage_bucket: "Resumes_lake".to_string(),
            bulk_enrich_delay: Duration::ZERO,
            enrichment_timeout: Duration::from_secs(1),
            enrichment_max_attempts: 1,
            max_upload_bytes: 8 * 1024 * 1024,
            port: 0,
            rust_log: "info".to_string(),
        },
    }
}

//! Bulk enrichment: drives single-resume enrichment across every pending resume,
//! strictly one at a time.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cache::AtsCache;
use crate::enrichment::EnrichmentService;
use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::reconcile::enrich::{enrich_resume, EnrichMode};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub resume_id: Uuid,
    pub candidate_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<BulkFailure>,
    /// Set when a cancellation stopped the run before the last item.
    pub cancelled: bool,
}

pub struct BulkEnrichment {
    store: Arc<dyn Store>,
    enrichment: Arc<dyn EnrichmentService>,
    cache: Arc<AtsCache>,
    delay: Duration,
    mode: EnrichMode,
}

impl BulkEnrichment {
    pub fn new(
        store: Arc<dyn Store>,
        enrichment: Arc<dyn EnrichmentService>,
        cache: Arc<AtsCache>,
        delay: Duration,
    ) -> Self {
        Self {
            store,
            enrichment,
            cache,
            delay,
            mode: EnrichMode::Replace,
        }
    }

    pub fn with_mode(mut self, mode: EnrichMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resumes that are linked to a candidate and not yet enriched, in listing order.
    pub async fn pending(&self) -> Result<Vec<ResumeRow>, AppError> {
        let resumes = self.store.list_resumes().await.map_err(AppError::storage)?;
        Ok(resumes
            .into_iter()
            .filter(ResumeRow::is_pending_enrichment)
            .collect())
    }

    /// Enriches every pending resume.
    ///
    /// `progress` receives `(current, total)` as each item starts. A failing item
    /// is recorded and the run moves on. The cache is refreshed once at the end,
    /// whatever the outcome of the items.
    pub async fn run<F>(
        &self,
        mut progress: F,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<BulkSummary, AppError>
    where
        F: FnMut(usize, usize) + Send,
    {
        let pending = self.pending().await?;
        let total = pending.len();
        let mut summary = BulkSummary {
            total,
            ..Default::default()
        };
        info!(total, mode = ?self.mode, "Starting bulk enrichment");

        for (idx, resume) in pending.iter().enumerate() {
            if cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
                warn!(processed = idx, total, "Bulk enrichment cancelled");
                summary.cancelled = true;
                break;
            }

            progress(idx + 1, total);
            match enrich_resume(
                self.store.as_ref(),
                self.enrichment.as_ref(),
                resume.id,
                self.mode,
            )
            .await
            {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    let candidate_name = resume.data().map(|d| d.name).unwrap_or_default();
                    error!(resume_id = %resume.id, candidate = %candidate_name, error = %e, "Bulk item failed");
                    summary.failed.push(BulkFailure {
                        resume_id: resume.id,
                        candidate_name,
                        error: e.to_string(),
                    });
                }
            }

            if idx + 1 < total {
                tokio::time::sleep(self.delay).await;
            }
        }

        if let Err(e) = self.cache.refresh(self.store.as_ref()).await {
            error!(error = %e, "Cache refresh after bulk enrichment failed");
        }

        info!(
            total,
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "Bulk enrichment finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;
    use tokio::time::Instant;

    use crate::models::candidate::{CandidateSource, NewCandidate};
    use crate::models::resume::NewResume;
    use crate::store::MemoryStore;
    use crate::testing::FakeEnrichment;

    async fn seed(store: &MemoryStore, names: &[&str]) {
        for name in names {
            let candidate = store
                .insert_candidate(&NewCandidate {
                    full_name: name.to_string(),
                    email: None,
                    phone: None,
                    location: None,
                    linkedin_url: Some(format!("https://profiles.example/{name}")),
                    source: CandidateSource::FileUpload,
                })
                .await
                .unwrap();
            store
                .insert_resume(&NewResume {
                    candidate_id: candidate.id,
                    parsed_data: json!({"name": name}),
                    file_url: None,
                    source: CandidateSource::FileUpload,
                    enriched: false,
                })
                .await
                .unwrap();
        }
    }

    fn orchestrator(store: Arc<MemoryStore>, fake: Arc<FakeEnrichment>, cache: Arc<AtsCache>) -> BulkEnrichment {
        BulkEnrichment::new(store, fake, cache, Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_abort_batch() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &["Ann", "Bob", "Cid", "Dee"]).await;
        let fake = Arc::new(FakeEnrichment {
            failing_names: ["Bob".to_string()].into(),
            ..Default::default()
        });
        let cache = Arc::new(AtsCache::new());
        let bulk = orchestrator(store.clone(), fake.clone(), cache.clone());

        let seen = Mutex::new(Vec::new());
        let started = Instant::now();
        let summary = bulk
            .run(|current, total| seen.lock().unwrap().push((current, total)), None)
            .await
            .unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].candidate_name, "Bob");
        assert_eq!(*seen.lock().unwrap(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        // Every item was attempted.
        assert_eq!(fake.calls().len(), 4);
        // Delay between items only, not after the last one.
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert_eq!(cache.generation(), 1);
        assert!(bulk.pending().await.unwrap().iter().all(|r| r.data().unwrap().name == "Bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_before_next_item() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &["Ann", "Bob", "Cid"]).await;
        let fake = Arc::new(FakeEnrichment::default());
        let cache = Arc::new(AtsCache::new());
        let bulk = orchestrator(store.clone(), fake.clone(), cache.clone());

        let (tx, rx) = watch::channel(false);
        let summary = bulk
            .run(
                |current, _| {
                    if current == 2 {
                        tx.send_replace(true);
                    }
                },
                Some(rx),
            )
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_enriched_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &["Ann"]).await;
        let done = store.list_resumes().await.unwrap()[0].id;
        store.update_resume_data(done, &json!({"name": "Ann"}), true).await.unwrap();

        let fake = Arc::new(FakeEnrichment::default());
        let cache = Arc::new(AtsCache::new());
        let summary = orchestrator(store, fake.clone(), cache.clone())
            .run(|_, _| {}, None)
            .await
            .unwrap();

        assert_eq!(summary.total, 0);
        assert!(fake.calls().is_empty());
        assert_eq!(cache.generation(), 1);
    }
}

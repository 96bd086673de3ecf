use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::candidate::CandidateSource;
use crate::models::resume_data::ResumeData;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    /// Lake imports may arrive without an owner; every ingested resume has one.
    pub candidate_id: Option<Uuid>,
    pub parsed_data: Value,
    pub file_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub source: CandidateSource,
    /// Monotonic: once true it is never written back to false.
    pub enriched: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ResumeRow {
    pub fn data(&self) -> Result<ResumeData, serde_json::Error> {
        ResumeData::from_value(&self.parsed_data)
    }

    /// Not yet enriched and linked to a candidate.
    pub fn is_pending_enrichment(&self) -> bool {
        !self.enriched && self.candidate_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewResume {
    pub candidate_id: Uuid,
    pub parsed_data: Value,
    pub file_url: Option<String>,
    pub source: CandidateSource,
    pub enriched: bool,
}

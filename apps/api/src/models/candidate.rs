use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

/// Where a candidate (or one of their resumes) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    /// Imported from an external profile.
    #[serde(rename = "linkedin")]
    ProfileImport,
    /// Uploaded resume file.
    #[serde(rename = "upload")]
    FileUpload,
    /// Pulled from the internal resume database.
    #[serde(rename = "cvtheque")]
    InternalDatabase,
}

impl CandidateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateSource::ProfileImport => "linkedin",
            CandidateSource::FileUpload => "upload",
            CandidateSource::InternalDatabase => "cvtheque",
        }
    }

    /// Lenient mapping for free-form source labels coming from clients.
    /// Anything unrecognised counts as a file upload.
    pub fn normalize(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "linkedin" => CandidateSource::ProfileImport,
            "cvtheque" | "cvthèque" => CandidateSource::InternalDatabase,
            _ => CandidateSource::FileUpload,
        }
    }
}

impl TryFrom<String> for CandidateSource {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "linkedin" => Ok(CandidateSource::ProfileImport),
            "upload" => Ok(CandidateSource::FileUpload),
            "cvtheque" => Ok(CandidateSource::InternalDatabase),
            _ => Err(UnknownVariant {
                kind: "candidate source",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub source: CandidateSource,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub source: CandidateSource,
}

/// Partial update of a candidate's contact fields. `None` leaves a column as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePatch {
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
}

impl CandidatePatch {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.location.is_none() && self.linkedin_url.is_none()
    }
}

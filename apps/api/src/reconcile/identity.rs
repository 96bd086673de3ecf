//! Candidate identity resolution: decides whether an incoming resume belongs to
//! an existing candidate or needs a new one.
//!
//! The only key is an exact, case-sensitive email match. No name matching is
//! attempted, so resumes without an email always produce a new candidate.

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{CandidateSource, NewCandidate};
use crate::models::resume_data::ResumeData;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCandidate {
    pub candidate_id: Uuid,
    /// True when this call inserted the candidate row.
    pub created: bool,
}

/// Resolves (or creates) the candidate owning `data`.
///
/// An existing candidate is reused as is; its stored fields are never
/// overwritten here. A creation that loses a race on the email constraint is
/// retried once as a lookup.
pub async fn resolve_candidate(
    store: &dyn Store,
    data: &ResumeData,
    source: CandidateSource,
) -> Result<ResolvedCandidate, AppError> {
    let email = data.identity_email();

    if let Some(email) = email {
        if let Some(existing) = store
            .find_candidate_by_email(email)
            .await
            .map_err(AppError::identity)?
        {
            info!(candidate_id = %existing.id, "Matched existing candidate by email");
            return Ok(ResolvedCandidate {
                candidate_id: existing.id,
                created: false,
            });
        }
    }

    let new_candidate = NewCandidate {
        full_name: data.name.trim().to_string(),
        email: email.map(String::from),
        phone: data.phone.clone().filter(|p| !p.trim().is_empty()),
        location: data.location.clone().filter(|l| !l.trim().is_empty()),
        linkedin_url: data.linkedin_url.clone().filter(|u| !u.trim().is_empty()),
        source,
    };

    match store.insert_candidate(&new_candidate).await {
        Ok(row) => {
            info!(candidate_id = %row.id, "Created candidate");
            Ok(ResolvedCandidate {
                candidate_id: row.id,
                created: true,
            })
        }
        Err(e) if e.is_constraint() => {
            let Some(email) = email else {
                return Err(AppError::identity(e));
            };
            warn!(error = %e, "Candidate insert hit the email constraint, re-reading");
            let existing = store
                .find_candidate_by_email(email)
                .await
                .map_err(AppError::identity)?
                .ok_or_else(|| AppError::IdentityResolution(e.to_string()))?;
            Ok(ResolvedCandidate {
                candidate_id: existing.id,
                created: false,
            })
        }
        Err(e) => Err(AppError::identity(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::resume_data;

    #[tokio::test]
    async fn test_same_email_same_candidate() {
        let store = MemoryStore::new();
        let first = resolve_candidate(
            &store,
            &resume_data("Jane Doe", Some("jane@x.com")),
            CandidateSource::FileUpload,
        )
        .await
        .unwrap();
        let second = resolve_candidate(
            &store,
            &resume_data("J. Doe", Some("jane@x.com")),
            CandidateSource::FileUpload,
        )
        .await
        .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.candidate_id, second.candidate_id);

        // The stored name is not overwritten by the second resume.
        let stored = store.get_candidate(first.candidate_id).await.unwrap().unwrap();
        assert_eq!(stored.full_name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_missing_email_always_new() {
        let store = MemoryStore::new();
        let a = resolve_candidate(&store, &resume_data("Jane Doe", None), CandidateSource::FileUpload)
            .await
            .unwrap();
        let b = resolve_candidate(&store, &resume_data("Jane Doe", Some(" ")), CandidateSource::FileUpload)
            .await
            .unwrap();
        assert_ne!(a.candidate_id, b.candidate_id);
        assert!(a.created && b.created);
    }

    #[tokio::test]
    async fn test_email_match_is_case_sensitive() {
        let store = MemoryStore::new();
        let a = resolve_candidate(&store, &resume_data("Jane", Some("jane@x.com")), CandidateSource::FileUpload)
            .await
            .unwrap();
        let b = resolve_candidate(&store, &resume_data("Jane", Some("Jane@X.com")), CandidateSource::FileUpload)
            .await
            .unwrap();
        assert_ne!(a.candidate_id, b.candidate_id);
    }

    #[tokio::test]
    async fn test_creation_failure_is_identity_error() {
        let store = MemoryStore::new();
        store.fail_on("insert_candidate");
        let err = resolve_candidate(&store, &resume_data("Jane", None), CandidateSource::FileUpload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IdentityResolution(_)));
    }
}

//! Single-resume enrichment and profile URL maintenance.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::enrichment::{EnrichmentService, ProfileQuery};
use crate::errors::AppError;
use crate::models::candidate::{CandidatePatch, CandidateRow};
use crate::models::resume::ResumeRow;
use crate::models::resume_data::ResumeData;
use crate::reconcile::merge::{merge_and_store, MergeInput};
use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichMode {
    /// Upstream re-derives the whole resume; the result replaces the stored one.
    #[default]
    Replace,
    /// Scraped profile data is merged over the stored resume.
    FieldPrecedence,
}

/// Enriches one resume from its owner's public profile.
///
/// The profile URL comes from the candidate row, then from the parsed data, and
/// is otherwise discovered and persisted to both. Without a URL the call fails.
pub async fn enrich_resume(
    store: &dyn Store,
    enrichment: &dyn EnrichmentService,
    resume_id: Uuid,
    mode: EnrichMode,
) -> Result<ResumeRow, AppError> {
    let resume = store
        .get_resume(resume_id)
        .await
        .map_err(AppError::storage)?
        .ok_or_else(|| AppError::NotFound(format!("resume {resume_id} not found")))?;
    let candidate_id = resume.candidate_id.ok_or_else(|| {
        AppError::Validation(format!("resume {resume_id} is not linked to a candidate"))
    })?;
    let candidate = store
        .get_candidate(candidate_id)
        .await
        .map_err(AppError::storage)?
        .ok_or_else(|| AppError::NotFound(format!("candidate {candidate_id} not found")))?;
    let mut data = stored_data(&resume)?;

    let name = if candidate.full_name.trim().is_empty() {
        data.name.clone()
    } else {
        candidate.full_name.clone()
    };

    let profile_url = resolve_profile_url(store, enrichment, &candidate, &resume, &mut data, &name)
        .await?
        .ok_or_else(|| AppError::Enrichment(format!("could not find a public profile for {name}")))?;

    let input = match mode {
        EnrichMode::Replace => MergeInput::Replacement(
            enrichment
                .enrich_from_profile(&data, Some(&profile_url), Some(&name))
                .await
                .map_err(AppError::enrichment)?,
        ),
        EnrichMode::FieldPrecedence => MergeInput::FieldPrecedence(
            enrichment
                .scrape_profile(&profile_url, Some(&name))
                .await
                .map_err(AppError::enrichment)?,
        ),
    };
    let row = merge_and_store(store, resume_id, input).await?;

    fill_contact_gaps(store, &candidate, &stored_data(&row)?).await?;

    info!(resume_id = %resume_id, candidate_id = %candidate_id, ?mode, "Resume enriched");
    Ok(row)
}

async fn resolve_profile_url(
    store: &dyn Store,
    enrichment: &dyn EnrichmentService,
    candidate: &CandidateRow,
    resume: &ResumeRow,
    data: &mut ResumeData,
    name: &str,
) -> Result<Option<String>, AppError> {
    if let Some(url) = non_blank(candidate.linkedin_url.as_deref()) {
        return Ok(Some(url.to_string()));
    }
    if let Some(url) = non_blank(data.linkedin_url.as_deref()) {
        return Ok(Some(url.to_string()));
    }

    let query = ProfileQuery {
        name: name.to_string(),
        company: data.current_company().map(String::from),
        location: data.location.clone().or_else(|| candidate.location.clone()),
    };
    let Some(url) = enrichment.find_profile_url(&query).await else {
        warn!(candidate_id = %candidate.id, "No public profile found");
        return Ok(None);
    };

    store
        .update_candidate(
            candidate.id,
            &CandidatePatch {
                linkedin_url: Some(url.clone()),
                ..Default::default()
            },
        )
        .await
        .map_err(AppError::storage)?;
    data.linkedin_url = Some(url.clone());
    let payload = data.to_value().map_err(|e| AppError::Internal(e.into()))?;
    store
        .update_resume_data(resume.id, &payload, false)
        .await
        .map_err(AppError::storage)?;

    info!(candidate_id = %candidate.id, "Discovered and stored profile URL");
    Ok(Some(url))
}

/// Copies location and phone from the enriched data onto the candidate where
/// the candidate has none. Existing values are never overwritten.
async fn fill_contact_gaps(
    store: &dyn Store,
    candidate: &CandidateRow,
    data: &ResumeData,
) -> Result<(), AppError> {
    let patch = CandidatePatch {
        phone: missing(candidate.phone.as_deref(), data.phone.as_deref()),
        location: missing(candidate.location.as_deref(), data.location.as_deref()),
        linkedin_url: None,
    };
    if patch.is_empty() {
        return Ok(());
    }
    store
        .update_candidate(candidate.id, &patch)
        .await
        .map_err(AppError::storage)?;
    Ok(())
}

fn missing(current: Option<&str>, incoming: Option<&str>) -> Option<String> {
    match non_blank(current) {
        Some(_) => None,
        None => non_blank(incoming).map(String::from),
    }
}

/// Sets the candidate's profile URL and mirrors it into each of their resumes.
pub async fn update_profile_url(
    store: &dyn Store,
    candidate_id: Uuid,
    url: &str,
) -> Result<CandidateRow, AppError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::Validation("profile URL must not be empty".to_string()));
    }

    let candidate = store
        .update_candidate(
            candidate_id,
            &CandidatePatch {
                linkedin_url: Some(url.to_string()),
                ..Default::default()
            },
        )
        .await
        .map_err(AppError::storage)?;

    let resumes = store.list_resumes().await.map_err(AppError::storage)?;
    for resume in resumes.iter().filter(|r| r.candidate_id == Some(candidate_id)) {
        let mut data = stored_data(resume)?;
        data.linkedin_url = Some(url.to_string());
        let payload = data.to_value().map_err(|e| AppError::Internal(e.into()))?;
        store
            .update_resume_data(resume.id, &payload, false)
            .await
            .map_err(AppError::storage)?;
    }

    info!(candidate_id = %candidate_id, "Profile URL updated");
    Ok(candidate)
}

fn stored_data(resume: &ResumeRow) -> Result<ResumeData, AppError> {
    resume.data().map_err(|e| {
        AppError::Storage(format!("resume {} holds malformed parsed data: {e}", resume.id))
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

//! Resume merge engine.
//!
//! Two modes: a replacement write that stores an upstream document as is, and a
//! field-precedence merge that lays scraped profile data over the stored resume.
//! Both are deterministic so re-running with the same inputs writes the same bytes.

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::models::resume_data::{ProfileData, ResumeData, ResumeSnapshot, SkillGroup, Skills};
use crate::store::Store;

/// Category under which profile-sourced skills are kept apart from resume skills.
pub const PROFILE_SKILLS_CATEGORY: &str = "LinkedIn Skills";

/// Key under which the profile headline is kept in the snapshot's extra fields.
pub const PROFILE_HEADLINE_KEY: &str = "headline";

#[derive(Debug, Clone)]
pub enum MergeInput {
    /// Full re-derived snapshot; its raw document replaces the stored payload.
    Replacement(ResumeSnapshot),
    /// Scraped profile data merged field by field over the stored payload.
    FieldPrecedence(ProfileData),
}

impl MergeInput {
    fn mode(&self) -> &'static str {
        match self {
            MergeInput::Replacement(_) => "replacement",
            MergeInput::FieldPrecedence(_) => "field_precedence",
        }
    }
}

/// Lays `profile` over `resume`.
///
/// Scalars and the experience/education lists come from the profile when it has
/// them. Profile skills are appended as their own group, replacing any group a
/// previous merge left behind. Contacts, accomplishments and interests are
/// unioned. The headline lands in the extra fields. Everything the profile does
/// not carry stays from the resume.
pub fn merge_profile(resume: &ResumeData, profile: &ProfileData) -> ResumeData {
    let mut merged = resume.clone();

    if let Some(name) = non_blank(profile.name.as_deref()) {
        merged.name = name.to_string();
    }
    if let Some(location) = non_blank(profile.location.as_deref()) {
        merged.location = Some(location.to_string());
    }
    if let Some(about) = profile.about_text() {
        merged.about = Some(about.to_string());
    }
    if let Some(headline) = non_blank(profile.headline.as_deref()) {
        merged
            .extra
            .insert(PROFILE_HEADLINE_KEY.to_string(), Value::String(headline.to_string()));
    }

    if !profile.experiences.is_empty() {
        merged.experiences = profile.experiences.clone();
    }
    if !profile.educations.is_empty() {
        merged.educations = profile.educations.clone();
    }

    merged.skills = merge_skills(&resume.skills, &profile.skills);

    merged.contacts = union(&resume.contacts, &profile.contacts);
    merged.accomplishments = union(&resume.accomplishments, &profile.accomplishments);
    merged.interests = union(&resume.interests, &profile.interests);

    merged
}

fn merge_skills(resume: &Skills, profile: &Skills) -> Skills {
    if profile.is_empty() {
        return resume.clone();
    }

    let mut groups: Vec<SkillGroup> = resume
        .groups()
        .into_iter()
        .filter(|g| g.category != PROFILE_SKILLS_CATEGORY)
        .collect();
    groups.push(SkillGroup {
        category: PROFILE_SKILLS_CATEGORY.to_string(),
        items: profile.names(),
    });
    Skills::Grouped(groups)
}

/// Order-preserving union over exact string equality.
fn union(base: &[String], incoming: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(base.len() + incoming.len());
    for item in base.iter().chain(incoming) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Computes the merged payload for `resume_id`, writes it and marks the resume
/// enriched. Only field-precedence mode reads the stored snapshot.
pub async fn merge_and_store(
    store: &dyn Store,
    resume_id: Uuid,
    input: MergeInput,
) -> Result<ResumeRow, AppError> {
    let mode = input.mode();
    let payload = match input {
        MergeInput::Replacement(snapshot) => snapshot.raw,
        MergeInput::FieldPrecedence(profile) => {
            let current = store
                .get_resume(resume_id)
                .await
                .map_err(AppError::storage)?
                .ok_or_else(|| AppError::NotFound(format!("resume {resume_id} not found")))?;
            let data = current.data().map_err(|e| {
                AppError::Storage(format!("resume {resume_id} holds malformed parsed data: {e}"))
            })?;
            merge_profile(&data, &profile)
                .to_value()
                .map_err(|e| AppError::Internal(e.into()))?
        }
    };

    let row = store
        .update_resume_data(resume_id, &payload, true)
        .await
        .map_err(AppError::storage)?;

    info!(resume_id = %resume_id, mode, "Stored merged resume data");
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::models::candidate::{CandidateSource, NewCandidate};
    use crate::models::resume::NewResume;
    use crate::store::MemoryStore;

    fn resume() -> ResumeData {
        serde_json::from_value(json!({
            "name": "Jane Doe",
            "email": "jane@x.com",
            "location": "Lyon",
            "open_to_work": true,
            "experiences": [{"position_title": "Analyst", "institution_name": "Acme"}],
            "skills": ["SQL", "Excel"],
            "interests": ["Chess", "Running"],
            "contacts": ["jane@x.com"]
        }))
        .unwrap()
    }

    fn profile() -> ProfileData {
        serde_json::from_value(json!({
            "name": "Jane A. Doe",
            "location": "",
            "about": "Data person",
            "headline": "Data Engineer at Globex",
            "experiences": [
                {"position_title": "Data Engineer", "institution_name": "Globex"},
                {"position_title": "Analyst", "institution_name": "Acme"}
            ],
            "skills": ["Python", "SQL"],
            "interests": ["Running", "Sailing"]
        }))
        .unwrap()
    }

    async fn stored(store: &MemoryStore, data: &ResumeData) -> ResumeRow {
        let candidate = store
            .insert_candidate(&NewCandidate {
                full_name: data.name.clone(),
                email: None,
                phone: None,
                location: None,
                linkedin_url: None,
                source: CandidateSource::FileUpload,
            })
            .await
            .unwrap();
        store
            .insert_resume(&NewResume {
                candidate_id: candidate.id,
                parsed_data: data.to_value().unwrap(),
                file_url: None,
                source: CandidateSource::FileUpload,
                enriched: false,
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_profile_precedence() {
        let merged = merge_profile(&resume(), &profile());
        assert_eq!(merged.name, "Jane A. Doe");
        // Blank profile value falls back to the resume.
        assert_eq!(merged.location.as_deref(), Some("Lyon"));
        assert_eq!(merged.about.as_deref(), Some("Data person"));
        assert_eq!(merged.extra[PROFILE_HEADLINE_KEY], "Data Engineer at Globex");
        assert_eq!(merged.experiences.len(), 2);
        assert_eq!(merged.experiences[0].institution_name, "Globex");
        assert_eq!(merged.open_to_work, Some(true));
        assert_eq!(merged.interests, vec!["Chess", "Running", "Sailing"]);
        assert_eq!(merged.contacts, vec!["jane@x.com"]);
    }

    #[test]
    fn test_empty_profile_lists_keep_resume_lists() {
        let merged = merge_profile(&resume(), &ProfileData::default());
        assert_eq!(merged, resume());
    }

    #[test]
    fn test_skill_provenance_kept_apart() {
        let merged = merge_profile(&resume(), &profile());
        let groups = merged.skills.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].items, vec!["SQL", "Excel"]);
        assert_eq!(groups[1].category, PROFILE_SKILLS_CATEGORY);
        assert_eq!(groups[1].items, vec!["Python", "SQL"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge_profile(&resume(), &profile());
        let twice = merge_profile(&once, &profile());
        assert_eq!(
            serde_json::to_vec(&once).unwrap(),
            serde_json::to_vec(&twice).unwrap()
        );
    }

    #[tokio::test]
    async fn test_replacement_stores_incoming_snapshot() {
        let store = MemoryStore::new();
        let base: ResumeData =
            serde_json::from_value(json!({"name": "A", "skills": ["SQL"]})).unwrap();
        let row = stored(&store, &base).await;
        assert!(!row.enriched);

        let incoming = json!({"name": "A", "summary": "y", "skills": ["SQL", "Python"]});
        let snapshot = ResumeSnapshot::from_value(incoming.clone()).unwrap();
        let updated = merge_and_store(&store, row.id, MergeInput::Replacement(snapshot))
            .await
            .unwrap();

        assert!(updated.enriched);
        assert_eq!(updated.parsed_data, incoming);
        assert_eq!(store.get_resume(row.id).await.unwrap().unwrap().parsed_data, incoming);
    }

    #[test]
    fn test_profile_summary_used_when_about_missing() {
        let profile: ProfileData =
            serde_json::from_value(json!({"about": "Lead", "summary": "Ignored"})).unwrap();
        assert_eq!(merge_profile(&resume(), &profile).about.as_deref(), Some("Lead"));

        let profile: ProfileData = serde_json::from_value(json!({"summary": "Builder"})).unwrap();
        assert_eq!(merge_profile(&resume(), &profile).about.as_deref(), Some("Builder"));
    }

    #[tokio::test]
    async fn test_field_precedence_reads_stored_snapshot() {
        let store = MemoryStore::new();
        let row = stored(&store, &resume()).await;

        let first = merge_and_store(&store, row.id, MergeInput::FieldPrecedence(profile()))
            .await
            .unwrap();
        let second = merge_and_store(&store, row.id, MergeInput::FieldPrecedence(profile()))
            .await
            .unwrap();

        assert!(first.enriched);
        assert_eq!(first.parsed_data, second.parsed_data);
        assert_eq!(first.data().unwrap().name, "Jane A. Doe");
    }

    #[tokio::test]
    async fn test_failed_write_is_storage_error() {
        let store = MemoryStore::new();
        let row = stored(&store, &resume()).await;
        store.fail_on("update_resume_data");

        let snapshot = ResumeSnapshot::from_data(resume()).unwrap();
        let err = merge_and_store(&store, row.id, MergeInput::Replacement(snapshot))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn test_missing_resume_is_not_found() {
        let store = MemoryStore::new();
        let err = merge_and_store(&store, Uuid::new_v4(), MergeInput::FieldPrecedence(profile()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

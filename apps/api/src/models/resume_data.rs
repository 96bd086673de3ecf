//! Parsed resume payload, the JSON document stored in `resumes.parsed_data`.
//!
//! Upstream services are loose about shape (nulls everywhere, skills either as a
//! flat string list or as `{category, items}` groups, extra keys). Everything is
//! normalised here, at deserialization time, so downstream code works against one
//! model and never inspects raw JSON.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Category used when loose skill strings are folded into a grouped list.
pub const GENERAL_SKILLS_CATEGORY: &str = "General";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub position_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub institution_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub from_date: Option<String>,
    #[serde(default)]
    pub to_date: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub institution_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub degree: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub from_date: Option<String>,
    #[serde(default)]
    pub to_date: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub project_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub from_date: Option<String>,
    #[serde(default)]
    pub to_date: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<String>,
}

/// Skills as delivered by upstream: either a flat list or categorized groups.
///
/// The delivered shape is kept so a replacement write stores exactly what the
/// enrichment service returned. Consumers read through [`Skills::groups`] or
/// [`Skills::names`] and never match on the variant themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Skills {
    Flat(Vec<String>),
    Grouped(Vec<SkillGroup>),
}

impl Default for Skills {
    fn default() -> Self {
        Skills::Flat(Vec::new())
    }
}

impl Skills {
    /// Canonical grouped view. A flat list becomes a single `General` group.
    pub fn groups(&self) -> Vec<SkillGroup> {
        match self {
            Skills::Flat(items) if items.is_empty() => Vec::new(),
            Skills::Flat(items) => vec![SkillGroup {
                category: GENERAL_SKILLS_CATEGORY.to_string(),
                items: items.clone(),
            }],
            Skills::Grouped(groups) => groups.clone(),
        }
    }

    /// Every skill name in order of appearance, without duplicates.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for group in self.groups() {
            for item in group.items {
                if !names.contains(&item) {
                    names.push(item);
                }
            }
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        self.groups().iter().all(|g| g.items.is_empty())
    }
}

impl<'de> Deserialize<'de> for Skills {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawSkill {
            Name(String),
            Group(SkillGroup),
        }

        let raw: Option<Vec<RawSkill>> = Option::deserialize(deserializer)?;
        let raw = raw.unwrap_or_default();

        if raw.iter().all(|r| matches!(r, RawSkill::Name(_))) {
            return Ok(Skills::Flat(
                raw.into_iter()
                    .filter_map(|r| match r {
                        RawSkill::Name(name) => Some(name),
                        RawSkill::Group(_) => None,
                    })
                    .collect(),
            ));
        }

        // Mixed list: loose names are gathered into one group at the position of
        // the first loose name.
        let mut groups: Vec<SkillGroup> = Vec::new();
        let mut general: Option<usize> = None;
        for skill in raw {
            match skill {
                RawSkill::Group(group) => groups.push(group),
                RawSkill::Name(name) => match general {
                    Some(idx) => groups[idx].items.push(name),
                    None => {
                        general = Some(groups.len());
                        groups.push(SkillGroup {
                            category: GENERAL_SKILLS_CATEGORY.to_string(),
                            items: vec![name],
                        });
                    }
                },
            }
        }
        Ok(Skills::Grouped(groups))
    }
}

/// Structured resume snapshot, the internal shape for both parsed uploads and
/// enrichment results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    /// Some parsers deliver the about text under this key, sometimes alongside `about`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub open_to_work: Option<bool>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experiences: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub educations: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: Skills,
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub accomplishments: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interests: Vec<String>,
    /// Keys this model does not know about, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResumeData {
    /// Decodes a stored `parsed_data` document. `null` decodes as an empty snapshot.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Non-blank email, the identity key.
    pub fn identity_email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// Most recent employer, used as the company hint for profile discovery.
    pub fn current_company(&self) -> Option<&str> {
        self.experiences
            .first()
            .map(|e| e.institution_name.as_str())
            .filter(|c| !c.trim().is_empty())
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// `about` when it has text, `summary` otherwise.
    pub fn about_text(&self) -> Option<&str> {
        first_non_blank(self.about.as_deref(), self.summary.as_deref())
    }
}

/// A replacement snapshot from the enrichment service.
///
/// `raw` is the document exactly as delivered and is what gets stored; `data`
/// is its decoded form, which proves the document is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeSnapshot {
    pub raw: Value,
    pub data: ResumeData,
}

impl ResumeSnapshot {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let data = ResumeData::deserialize(&raw)?;
        Ok(Self { raw, data })
    }

    pub fn from_data(data: ResumeData) -> Result<Self, serde_json::Error> {
        Ok(Self {
            raw: data.to_value()?,
            data,
        })
    }
}

/// Profile data scraped from an external profile page. Carries no resume-only
/// flags such as `open_to_work`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experiences: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub educations: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: Skills,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contacts: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub accomplishments: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interests: Vec<String>,
}

impl ProfileData {
    pub fn about_text(&self) -> Option<&str> {
        first_non_blank(self.about.as_deref(), self.summary.as_deref())
    }
}

fn first_non_blank<'a>(first: Option<&'a str>, second: Option<&'a str>) -> Option<&'a str> {
    first
        .filter(|v| !v.trim().is_empty())
        .or_else(|| second.filter(|v| !v.trim().is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_skills_stay_flat() {
        let data: ResumeData = serde_json::from_value(json!({
            "name": "A",
            "skills": ["SQL", "Python"]
        }))
        .unwrap();
        assert_eq!(
            data.skills,
            Skills::Flat(vec!["SQL".to_string(), "Python".to_string()])
        );
        assert_eq!(data.skills.groups()[0].category, GENERAL_SKILLS_CATEGORY);
    }

    #[test]
    fn test_grouped_skills() {
        let data: ResumeData = serde_json::from_value(json!({
            "name": "A",
            "skills": [{"category": "Languages", "items": ["Rust", "Go"]}]
        }))
        .unwrap();
        assert_eq!(data.skills.names(), vec!["Rust", "Go"]);
        assert!(matches!(data.skills, Skills::Grouped(_)));
    }

    #[test]
    fn test_mixed_skills_fold_into_general_group() {
        let skills: Skills = serde_json::from_value(json!([
            "Docker",
            {"category": "Languages", "items": ["Rust"]},
            "K8s"
        ]))
        .unwrap();
        let groups = skills.groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, GENERAL_SKILLS_CATEGORY);
        assert_eq!(groups[0].items, vec!["Docker", "K8s"]);
        assert_eq!(groups[1].category, "Languages");
    }

    #[test]
    fn test_nulls_decode_as_empty() {
        let data: ResumeData = serde_json::from_value(json!({
            "name": "A",
            "experiences": null,
            "skills": null,
            "interests": null
        }))
        .unwrap();
        assert!(data.experiences.is_empty());
        assert!(data.skills.is_empty());
        assert!(data.interests.is_empty());
    }

    #[test]
    fn test_summary_and_extra_keys_survive() {
        let data: ResumeData = serde_json::from_value(json!({
            "name": "A",
            "summary": "Backend engineer",
            "linkedinData": {"headline": "Engineer"}
        }))
        .unwrap();
        assert_eq!(data.about_text(), Some("Backend engineer"));
        let back = data.to_value().unwrap();
        assert_eq!(back["summary"], "Backend engineer");
        assert_eq!(back["linkedinData"]["headline"], "Engineer");
    }

    #[test]
    fn test_about_wins_over_summary() {
        let data: ResumeData = serde_json::from_value(json!({
            "name": "A",
            "about": "x",
            "summary": "y"
        }))
        .unwrap();
        assert_eq!(data.about_text(), Some("x"));

        let profile: ProfileData = serde_json::from_value(json!({
            "about": " ",
            "summary": "y"
        }))
        .unwrap();
        assert_eq!(profile.about_text(), Some("y"));
    }

    #[test]
    fn test_snapshot_keeps_raw_document() {
        let raw = json!({"name": "A", "skills": ["SQL", "Python"]});
        let snapshot = ResumeSnapshot::from_value(raw.clone()).unwrap();
        assert_eq!(snapshot.raw, raw);
        assert_eq!(snapshot.data.skills.names(), vec!["SQL", "Python"]);
        assert!(ResumeSnapshot::from_value(json!({"name": "A", "skills": 3})).is_err());
    }

    #[test]
    fn test_blank_email_is_not_an_identity() {
        let data = ResumeData {
            email: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(data.identity_email(), None);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    NextRound,
    Declined,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::NextRound => "next_round",
            ApplicationStatus::Declined => "declined",
            ApplicationStatus::Hired => "hired",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Declined | ApplicationStatus::Hired)
    }

    /// Conventional forward transitions. Not enforced; callers only warn when a
    /// transition falls outside it.
    pub fn is_conventional_transition(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        match (self, next) {
            (from, to) if from == to => true,
            (Declined | Hired, _) => false,
            (_, Declined) => true,
            (Applied, Shortlisted | NextRound) => true,
            (Shortlisted | NextRound, Shortlisted | NextRound | Hired) => true,
            _ => false,
        }
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "applied" => Ok(ApplicationStatus::Applied),
            "shortlisted" => Ok(ApplicationStatus::Shortlisted),
            "next_round" => Ok(ApplicationStatus::NextRound),
            "declined" => Ok(ApplicationStatus::Declined),
            "hired" => Ok(ApplicationStatus::Hired),
            _ => Err(UnknownVariant {
                kind: "application status",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_offer_id: Uuid,
    pub candidate_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub current_stage_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_offer_id: Uuid,
    pub candidate_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub current_stage_id: Option<Uuid>,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationScoreRow {
    pub id: Uuid,
    pub application_id: Uuid,
    pub score_type: String,
    pub score_value: f64,
    pub explanation: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewApplicationScore {
    pub score_type: String,
    pub score_value: f64,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declined_reachable_from_any_open_state() {
        for from in [
            ApplicationStatus::Applied,
            ApplicationStatus::Shortlisted,
            ApplicationStatus::NextRound,
        ] {
            assert!(from.is_conventional_transition(ApplicationStatus::Declined));
        }
    }

    #[test]
    fn test_terminal_states_do_not_move() {
        assert!(ApplicationStatus::Declined.is_terminal());
        assert!(ApplicationStatus::Hired.is_terminal());
        assert!(!ApplicationStatus::Declined.is_conventional_transition(ApplicationStatus::Applied));
        assert!(!ApplicationStatus::Hired.is_conventional_transition(ApplicationStatus::Declined));
    }

    #[test]
    fn test_hired_only_after_shortlist() {
        assert!(!ApplicationStatus::Applied.is_conventional_transition(ApplicationStatus::Hired));
        assert!(ApplicationStatus::NextRound.is_conventional_transition(ApplicationStatus::Hired));
    }

    #[test]
    fn test_status_serde_matches_stored_value() {
        let json = serde_json::to_string(&ApplicationStatus::NextRound).unwrap();
        assert_eq!(json, "\"next_round\"");
        assert_eq!(
            ApplicationStatus::try_from("next_round".to_string()).unwrap(),
            ApplicationStatus::NextRound
        );
    }
}

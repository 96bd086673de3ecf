//! Failure policy per external call, declared up front rather than decided at
//! each call site.

use tracing::warn;

use crate::enrichment::EnrichmentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentCall {
    ParseResume,
    FindProfile,
    EnrichResume,
    ScrapeProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Hand the error to the caller.
    Propagate,
    /// Log and resolve to "nothing found".
    DegradeToEmpty,
}

impl EnrichmentCall {
    pub const fn path(self) -> &'static str {
        match self {
            EnrichmentCall::ParseResume => "/api/parse-resume",
            EnrichmentCall::FindProfile => "/api/find-linkedin",
            EnrichmentCall::EnrichResume => "/api/enrich-resume",
            EnrichmentCall::ScrapeProfile => "/api/scrape-linkedin",
        }
    }

    pub const fn policy(self) -> FailurePolicy {
        match self {
            EnrichmentCall::FindProfile => FailurePolicy::DegradeToEmpty,
            EnrichmentCall::ParseResume
            | EnrichmentCall::EnrichResume
            | EnrichmentCall::ScrapeProfile => FailurePolicy::Propagate,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            EnrichmentCall::ParseResume => "parse_resume",
            EnrichmentCall::FindProfile => "find_profile",
            EnrichmentCall::EnrichResume => "enrich_resume",
            EnrichmentCall::ScrapeProfile => "scrape_profile",
        }
    }

    /// Applies this call's policy: a degraded failure becomes `Ok(None)`.
    pub fn settle<T>(self, result: Result<T, EnrichmentError>) -> Result<Option<T>, EnrichmentError> {
        match (result, self.policy()) {
            (Ok(value), _) => Ok(Some(value)),
            (Err(e), FailurePolicy::DegradeToEmpty) => {
                warn!(call = self.name(), error = %e, "Best-effort call failed, continuing without result");
                Ok(None)
            }
            (Err(e), FailurePolicy::Propagate) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_profile_lookup_degrades() {
        assert_eq!(EnrichmentCall::FindProfile.policy(), FailurePolicy::DegradeToEmpty);
        assert_eq!(EnrichmentCall::ParseResume.policy(), FailurePolicy::Propagate);
        assert_eq!(EnrichmentCall::EnrichResume.policy(), FailurePolicy::Propagate);
        assert_eq!(EnrichmentCall::ScrapeProfile.policy(), FailurePolicy::Propagate);
    }

    #[test]
    fn test_settle_degrades_to_none() {
        let result: Result<String, _> = Err(EnrichmentError::EmptyPayload);
        assert!(matches!(EnrichmentCall::FindProfile.settle(result), Ok(None)));
    }

    #[test]
    fn test_settle_propagates() {
        let result: Result<String, _> = Err(EnrichmentError::MissingName);
        assert!(matches!(
            EnrichmentCall::ParseResume.settle(result),
            Err(EnrichmentError::MissingName)
        ));
    }
}

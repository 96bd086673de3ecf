//! Enrichment client: the single point of entry for the resume parsing and
//! profile lookup/scrape services.
//!
//! No other module talks to those services directly; domain code depends on the
//! `EnrichmentService` trait so tests can substitute a fake.
//!
//! Every response is expected in a `{ "data": ... }` envelope; an unwrapped
//! payload is accepted as well.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub mod policy;

use crate::models::resume_data::{ProfileData, ResumeData, ResumeSnapshot};
use policy::EnrichmentCall;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Could not extract a name from the resume")]
    MissingName,

    #[error("Service returned no data")]
    EmptyPayload,
}

/// An uploaded resume file, held in memory for the length of one ingestion.
#[derive(Debug, Clone)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Search hints for profile discovery.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileQuery {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
struct EnrichRequest<'a> {
    resume_data: &'a ResumeData,
    #[serde(skip_serializing_if = "Option::is_none")]
    linkedin_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    profile_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct FoundProfile {
    url: Option<String>,
}

/// The external capabilities the reconciliation pipeline consumes.
///
/// Carried in `AppState` as `Arc<dyn EnrichmentService>`.
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    /// Parses a resume file. A payload without a usable name is rejected.
    async fn parse_resume(&self, file: &ResumeFile) -> Result<ResumeData, EnrichmentError>;

    /// Best effort: any failure resolves to `None`.
    async fn find_profile_url(&self, query: &ProfileQuery) -> Option<String>;

    /// Returns a complete replacement snapshot derived from the profile.
    async fn enrich_from_profile(
        &self,
        existing: &ResumeData,
        profile_url: Option<&str>,
        name: Option<&str>,
    ) -> Result<ResumeSnapshot, EnrichmentError>;

    /// Scrapes raw profile data for a field-precedence merge.
    async fn scrape_profile(
        &self,
        profile_url: &str,
        name: Option<&str>,
    ) -> Result<ProfileData, EnrichmentError>;
}

/// HTTP client for the enrichment API. Retries 429 and 5xx responses with
/// exponential backoff.
#[derive(Clone)]
pub struct EnrichmentClient {
    client: Client,
    base_url: String,
    max_attempts: u32,
}

impl EnrichmentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EnrichmentError> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sends one logical call, rebuilding the request for every attempt, and
    /// returns the unwrapped envelope payload.
    async fn send<F>(&self, call: EnrichmentCall, build: F) -> Result<Value, EnrichmentError>
    where
        F: Fn(&Client, String) -> Result<RequestBuilder, EnrichmentError> + Send + Sync,
    {
        let url = format!("{}{}", self.base_url, call.path());
        let mut last_error: Option<EnrichmentError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    call = call.name(),
                    "Enrichment call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build(&self.client, url.clone())?.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EnrichmentError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!(call = call.name(), "Enrichment API returned {}: {}", status, body);
                last_error = Some(EnrichmentError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(EnrichmentError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let body: Value = response.json().await?;
            debug!(call = call.name(), "Enrichment call succeeded");
            return Ok(unwrap_envelope(body).unwrap_or(Value::Null));
        }

        Err(last_error.unwrap_or(EnrichmentError::EmptyPayload))
    }

    async fn lookup_profile(&self, query: &ProfileQuery) -> Result<Option<String>, EnrichmentError> {
        let payload = self
            .send(EnrichmentCall::FindProfile, |client, url| {
                Ok(client.post(url).json(query))
            })
            .await?;
        if payload.is_null() {
            return Ok(None);
        }
        let found: FoundProfile = serde_json::from_value(payload)?;
        Ok(found.url.filter(|u| !u.trim().is_empty()))
    }
}

#[async_trait]
impl EnrichmentService for EnrichmentClient {
    async fn parse_resume(&self, file: &ResumeFile) -> Result<ResumeData, EnrichmentError> {
        let payload = self
            .send(EnrichmentCall::ParseResume, |client, url| {
                let mut part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
                    .file_name(file.file_name.clone());
                if let Some(content_type) = &file.content_type {
                    part = part.mime_str(content_type)?;
                }
                let form = reqwest::multipart::Form::new().part("file", part);
                Ok(client.post(url).multipart(form))
            })
            .await?;
        decode_parsed_resume(payload)
    }

    async fn find_profile_url(&self, query: &ProfileQuery) -> Option<String> {
        let call = EnrichmentCall::FindProfile;
        call.settle(self.lookup_profile(query).await)
            .ok()
            .flatten()
            .flatten()
    }

    async fn enrich_from_profile(
        &self,
        existing: &ResumeData,
        profile_url: Option<&str>,
        name: Option<&str>,
    ) -> Result<ResumeSnapshot, EnrichmentError> {
        let request = EnrichRequest {
            resume_data: existing,
            linkedin_url: profile_url,
            name,
        };
        let payload = self
            .send(EnrichmentCall::EnrichResume, |client, url| {
                Ok(client.post(url).json(&request))
            })
            .await?;
        if !payload.is_object() {
            return Err(EnrichmentError::EmptyPayload);
        }
        Ok(ResumeSnapshot::from_value(payload)?)
    }

    async fn scrape_profile(
        &self,
        profile_url: &str,
        name: Option<&str>,
    ) -> Result<ProfileData, EnrichmentError> {
        let request = ScrapeRequest { profile_url, name };
        let payload = self
            .send(EnrichmentCall::ScrapeProfile, |client, url| {
                Ok(client.post(url).json(&request))
            })
            .await?;
        if !payload.is_object() {
            return Err(EnrichmentError::EmptyPayload);
        }
        Ok(ProfileData::deserialize(payload)?)
    }
}

/// Exponential backoff before retry `attempt` (1-based): 500ms, 1s, 2s... capped
/// at `MAX_BACKOFF`.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor)).min(MAX_BACKOFF)
}

/// `{ "data": X }` → `X`, `{ "data": null }` → nothing; any other body is taken
/// as an unwrapped payload.
fn unwrap_envelope(body: Value) -> Option<Value> {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").filter(|data| !data.is_null())
        }
        Value::Null => None,
        other => Some(other),
    }
}

fn decode_parsed_resume(payload: Value) -> Result<ResumeData, EnrichmentError> {
    if !payload.is_object() {
        return Err(EnrichmentError::MissingName);
    }
    let data = ResumeData::deserialize(payload)?;
    if !data.has_name() {
        return Err(EnrichmentError::MissingName);
    }
    Ok(data)
}

use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_ENRICHMENT_API_URL: &str = "https://web-production-f19a8.up.railway.app";
const DEFAULT_STORAGE_BUCKET: &str = "Resumes_lake";
const DEFAULT_MAX_UPLOAD_MB: usize = 50;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Without it the service runs on the in-process store.
    pub database_url: Option<String>,
    pub enrichment_api_url: String,
    pub storage_public_url: String,
    pub storage_bucket: String,
    pub bulk_enrich_delay: Duration,
    pub enrichment_timeout: Duration,
    /// Attempts per enrichment call, counting the first one.
    pub enrichment_max_attempts: u32,
    /// Body limit of a whole multipart upload request.
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            enrichment_api_url: optional_env("ENRICHMENT_API_URL")
                .unwrap_or_else(|| DEFAULT_ENRICHMENT_API_URL.to_string()),
            storage_public_url: require_env("STORAGE_PUBLIC_URL")?,
            storage_bucket: optional_env("STORAGE_BUCKET")
                .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
            bulk_enrich_delay: Duration::from_millis(
                parse_env("BULK_ENRICH_DELAY_MS", 2000)
                    .context("BULK_ENRICH_DELAY_MS must be a number of milliseconds")?,
            ),
            enrichment_timeout: Duration::from_secs(
                parse_env("ENRICHMENT_TIMEOUT_SECS", 120)
                    .context("ENRICHMENT_TIMEOUT_SECS must be a number of seconds")?,
            ),
            enrichment_max_attempts: parse_env("ENRICHMENT_MAX_ATTEMPTS", 3)
                .context("ENRICHMENT_MAX_ATTEMPTS must be a positive number")?,
            max_upload_bytes: parse_env("MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)
                .context("MAX_UPLOAD_MB must be a number of megabytes")?
                .saturating_mul(1024 * 1024),
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => Ok(raw.trim().parse::<T>()?),
        None => Ok(default),
    }
}

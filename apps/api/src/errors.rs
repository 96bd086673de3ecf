use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::enrichment::EnrichmentError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Resume file unusable or the remote parser is unavailable.
    #[error("Resume parse failed: {0}")]
    Parse(String),

    /// Remote enrichment call failed or no profile could be located.
    #[error("Enrichment failed: {0}")]
    Enrichment(String),

    /// Looking up or creating the owning candidate failed.
    #[error("Candidate identity resolution failed: {0}")]
    IdentityResolution(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Removing these stages would orphan applications currently on them.
    #[error("Pipeline stages still hold active applications: {stage_ids:?}")]
    StageInUse { stage_ids: Vec<Uuid> },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn storage(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                AppError::NotFound(format!("{entity} {id} not found"))
            }
            other => AppError::Storage(other.to_string()),
        }
    }

    pub fn identity(err: StoreError) -> Self {
        AppError::IdentityResolution(err.to_string())
    }

    pub fn parse(err: EnrichmentError) -> Self {
        AppError::Parse(err.to_string())
    }

    pub fn enrichment(err: EnrichmentError) -> Self {
        AppError::Enrichment(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Parse(msg) => {
                tracing::warn!("Resume parse error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "PARSE_ERROR",
                    msg.clone(),
                )
            }
            AppError::Enrichment(msg) => {
                tracing::error!("Enrichment error: {msg}");
                (StatusCode::BAD_GATEWAY, "ENRICHMENT_ERROR", msg.clone())
            }
            AppError::IdentityResolution(msg) => {
                tracing::error!("Identity resolution error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IDENTITY_RESOLUTION_ERROR",
                    msg.clone(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    msg.clone(),
                )
            }
            AppError::StageInUse { stage_ids } => (
                StatusCode::CONFLICT,
                "STAGE_IN_USE",
                format!(
                    "{} stage(s) still have candidates; move them before deleting the stage",
                    stage_ids.len()
                ),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let id = Uuid::new_v4();
        let err = AppError::storage(StoreError::not_found("resume", id));
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains(&id.to_string())));
    }

    #[test]
    fn test_stage_in_use_is_conflict() {
        let response = AppError::StageInUse {
            stage_ids: vec![Uuid::new_v4()],
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_parse_error_is_unprocessable() {
        let response = AppError::parse(EnrichmentError::MissingName).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

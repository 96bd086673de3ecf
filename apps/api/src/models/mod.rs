pub mod application;
pub mod candidate;
pub mod job_offer;
pub mod resume;
pub mod resume_data;

use thiserror::Error;

/// A stored text column held a value outside its closed set.
#[derive(Debug, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

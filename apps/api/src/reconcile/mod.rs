//! Candidate reconciliation: identity, ingestion, enrichment and merging.

pub mod bulk;
pub mod enrich;
pub mod handlers;
pub mod identity;
pub mod ingest;
pub mod merge;

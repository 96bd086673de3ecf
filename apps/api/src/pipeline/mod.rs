//! Hiring pipelines: job offers, their ordered rounds, and where each
//! application sits in them.

pub mod applications;
pub mod handlers;
pub mod jobs;
pub mod rounds;

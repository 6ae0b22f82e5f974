//! Job Matching: semantic retrieval of job postings for an extracted resume profile.
//!
//! Flow: normalize profile → embed → index query → rank → format.
//! The core has no knowledge of HTTP; `handlers` adapts it to Axum.

pub mod embedding;
pub mod handlers;
pub mod hash_embedder;
pub mod http_embedder;
pub mod index;
pub mod matcher;
pub mod memory_index;
pub mod output;
pub mod pg_index;
pub mod profile;

use thiserror::Error;

/// Failures raised by the matching pipeline.
///
/// Infra variants are safe to retry with backoff; shape/argument variants are
/// caller bugs. `EmptyIndex` is a reportable "no data" condition, never retried.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Malformed profile: {0}")]
    MalformedProfile(String),

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Job index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Job index holds no records")]
    EmptyIndex,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl MatchError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MatchError::EmbeddingUnavailable(_) | MatchError::IndexUnavailable(_)
        )
    }
}

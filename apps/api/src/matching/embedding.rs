//! Embedding Provider boundary: turns free text into a dense vector.
//!
//! Loading a model is expensive, so a provider is built once in `main` and shared as
//! `Arc<dyn Embedder>` for the life of the process. Backends:
//! - `HttpEmbedder`: remote sentence-embedding server (default).
//! - `HashEmbedder`: deterministic feature hashing, no model, for dev and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::matching::MatchError;

/// Fixed-length dense vector. Vectors are only comparable when they share a
/// dimensionality and come from the same model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> f32 {
        cosine_similarity(&self.0, &other.0)
    }
}

/// The embedding provider trait. Implementations must be deterministic for a fixed
/// model version and safe to call concurrently.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, e.g. `sentence-transformers/all-MiniLM-L6-v2`.
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, MatchError>;
}

/// Shared guard: empty text has no meaningful embedding.
pub fn ensure_embeddable(text: &str) -> Result<(), MatchError> {
    if text.trim().is_empty() {
        return Err(MatchError::EmbeddingUnavailable(
            "cannot embed empty text".to_string(),
        ));
    }
    Ok(())
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

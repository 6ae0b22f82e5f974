//! Feature-hashing embedder for development and tests.
//!
//! Lower-cased alphanumeric tokens are hashed into signed buckets and the result is
//! L2-normalized. No model download, no network; the same text always yields the
//! same vector.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use siphasher::sip::SipHasher13;

use crate::matching::embedding::{ensure_embeddable, Embedder, EmbeddingVector};
use crate::matching::MatchError;

/// Fixed keys keep bucket assignment stable across processes and Rust versions.
/// Changing them changes every vector: bump `HASH_MODEL_VERSION` and re-embed the index.
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

pub const HASH_MODEL_VERSION: &str = "feature-hash-v1";

/// Feature-hashing embedder.
///
/// Lower-cased alphanumeric tokens are hashed into signed buckets, then the vector is
/// L2-normalised. No model download, no network; identical text always yields an
/// identical vector. Suitable for development indexes and tests, not for production
/// relevance.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash(&self, token: &str, salt: u8) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        salt.hash(&mut hasher);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let idx = (self.hash(&token, 0) % self.dimension as u64) as usize;
            let sign = if self.hash(&token, 1) % 2 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        HASH_MODEL_VERSION
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, MatchError> {
        ensure_embeddable(text)?;
        Ok(EmbeddingVector::new(self.vectorize(text)))
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

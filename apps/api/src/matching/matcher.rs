//! Matcher: normalize → embed → query → convert scores → rank → truncate.
//!
//! Score convention for everything leaving this module: cosine **similarity**,
//! higher is better. Each `JobIndex` declares whether its raw score is a distance
//! or a similarity; the matcher converts before ranking and never guesses.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::matching::embedding::Embedder;
use crate::matching::index::{JobIndex, JobMetadata, MetadataFilter};
use crate::matching::profile::{normalize, Profile};
use crate::matching::MatchError;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// The posting half of a match. Embeddings are not carried past the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedJob {
    pub id: String,
    pub metadata: JobMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub job: MatchedJob,
    /// Cosine similarity in [-1, 1]; higher is better.
    pub similarity_score: f32,
}

/// Results ordered by descending similarity, ties by ascending job id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankedResultSet(Vec<MatchResult>);

impl RankedResultSet {
    pub fn as_slice(&self) -> &[MatchResult] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RankedResultSet {
    type Item = &'a MatchResult;
    type IntoIter = std::slice::Iter<'a, MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Matcher
// ────────────────────────────────────────────────────────────────────────────

/// Holds no per-call state: the embedder is built once and shared, the index is
/// read-only and externally owned. Cheap to clone.
#[derive(Clone)]
pub struct Matcher {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn JobIndex>,
}

impl Matcher {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn JobIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn index(&self) -> &dyn JobIndex {
        self.index.as_ref()
    }

    /// Ranks indexed postings against `profile`.
    ///
    /// An empty result is a normal "no good matches" outcome; `EmptyIndex` means the
    /// index has no data at all. `top_k <= 0` fails with `InvalidArgument`.
    pub async fn find_matches(
        &self,
        profile: &Profile,
        top_k: i64,
        filter: Option<&MetadataFilter>,
    ) -> Result<RankedResultSet, MatchError> {
        let top_k = validate_top_k(top_k)?;

        let text = normalize(profile);
        debug!(chars = text.as_str().len(), "Profile normalized");

        let vector = self.embedder.embed(text.as_str()).await?;
        debug!(
            model = self.embedder.model_name(),
            dimension = vector.dimension(),
            "Profile embedded"
        );

        let raw = self.index.query(&vector, top_k, filter).await?;
        debug!(raw_results = raw.len(), score_kind = %self.index.score_kind(), "Index queried");

        let score_kind = self.index.score_kind();
        let results: Vec<MatchResult> = raw
            .into_iter()
            .map(|hit| MatchResult {
                similarity_score: score_kind.to_similarity(hit.raw_score),
                job: MatchedJob {
                    id: hit.record.id,
                    metadata: hit.record.metadata,
                },
            })
            .collect();

        let ranked = rank(results, top_k);
        info!(
            returned = ranked.len(),
            best = ranked.as_slice().first().map(|r| r.similarity_score),
            "Job matching complete"
        );
        Ok(ranked)
    }
}

/// `top_k` must be a positive integer.
pub fn validate_top_k(top_k: i64) -> Result<NonZeroUsize, MatchError> {
    usize::try_from(top_k)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            MatchError::InvalidArgument(format!("top_k must be a positive integer, got {top_k}"))
        })
}

/// Sorts by similarity descending, ties by id ascending, then truncates.
pub(crate) fn rank(mut results: Vec<MatchResult>, top_k: NonZeroUsize) -> RankedResultSet {
    results.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| a.job.id.cmp(&b.job.id))
    });
    results.truncate(top_k.get());
    RankedResultSet(results)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! Job Index boundary: a read-only collection of job postings with precomputed embeddings.
//!
//! Population is owned by an external ingestion job; the matcher only ever calls `query`.
//! Backends: `MemoryIndex` (JSON Lines file, reports similarity) and `PgIndex`
//! (pgvector table, reports cosine distance).

use std::fmt;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::matching::embedding::EmbeddingVector;
use crate::matching::MatchError;

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

/// Free-form posting metadata (title, company, location, skills, link, summary, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobMetadata(Map<String, Value>);

impl JobMetadata {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String-valued field, or `None` when absent or not a string.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// A posting as stored in the index. Immutable once indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub embedding: EmbeddingVector,
    #[serde(default)]
    pub metadata: JobMetadata,
}

/// Which direction the index's raw score points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// 0 = identical, larger = more different (cosine distance = 1 - similarity).
    Distance,
    /// 1 = identical direction, -1 = opposite.
    Similarity,
}

impl ScoreKind {
    /// Converts a raw index score to the similarity convention (higher is better).
    pub fn to_similarity(self, raw_score: f32) -> f32 {
        match self {
            ScoreKind::Distance => 1.0 - raw_score,
            ScoreKind::Similarity => raw_score,
        }
    }
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreKind::Distance => f.write_str("distance"),
            ScoreKind::Similarity => f.write_str("similarity"),
        }
    }
}

/// One raw hit from `JobIndex::query`.
#[derive(Debug, Clone)]
pub struct ScoredJob {
    pub record: JobRecord,
    pub raw_score: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Filters
// ────────────────────────────────────────────────────────────────────────────

/// A single exact-equality constraint on a metadata field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEquals {
    pub field: String,
    /// Always a JSON scalar: string, number, or bool.
    pub value: Value,
}

/// Conjunction of equality constraints. Empty means "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    constraints: Vec<FieldEquals>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.push(FieldEquals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Builds a filter from a JSON object of `field: scalar` pairs.
    pub fn from_value(value: Value) -> Result<Self, MatchError> {
        let Value::Object(map) = value else {
            return Err(MatchError::InvalidArgument(
                "filters must be a JSON object".to_string(),
            ));
        };

        let mut filter = MetadataFilter::new();
        for (field, value) in map {
            match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    filter.constraints.push(FieldEquals { field, value })
                }
                _ => {
                    return Err(MatchError::InvalidArgument(format!(
                        "filter on '{field}' must be a string, number, or boolean"
                    )))
                }
            }
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[FieldEquals] {
        &self.constraints
    }

    pub fn matches(&self, metadata: &JobMetadata) -> bool {
        self.constraints.iter().all(|c| {
            metadata
                .get(&c.field)
                .is_some_and(|actual| scalar_eq(&c.value, actual))
        })
    }

    /// The filter as a JSON object, for JSONB containment queries.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .constraints
            .iter()
            .map(|c| (c.field.clone(), c.value.clone()))
            .collect();
        Value::Object(map)
    }
}

/// Numbers compare by value so `3` matches `3.0`, as JSONB containment does.
fn scalar_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => expected == actual,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Nearest-neighbour lookup over indexed postings. Query never mutates the index.
///
/// Carried in `AppState` inside the `Matcher` as `Arc<dyn JobIndex>`.
#[async_trait]
pub trait JobIndex: Send + Sync {
    /// Short backend label for status reporting ("file", "postgres").
    fn backend(&self) -> &'static str;

    /// Direction of `ScoredJob::raw_score` for this backend.
    fn score_kind(&self) -> ScoreKind;

    async fn len(&self) -> Result<usize, MatchError>;

    /// Returns up to `top_k` records best-first, restricted by `filter` when given.
    /// Fails with `EmptyIndex` when the collection holds no records at all.
    async fn query(
        &self,
        vector: &EmbeddingVector,
        top_k: NonZeroUsize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredJob>, MatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> JobMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_distance_converts_to_similarity() {
        assert_eq!(ScoreKind::Distance.to_similarity(0.0), 1.0);
        assert_eq!(ScoreKind::Distance.to_similarity(0.25), 0.75);
        assert_eq!(ScoreKind::Distance.to_similarity(2.0), -1.0);
    }

    #[test]
    fn test_similarity_passes_through() {
        assert_eq!(ScoreKind::Similarity.to_similarity(0.42), 0.42);
    }

    #[test]
    fn test_filter_requires_all_constraints() {
        let filter = MetadataFilter::new()
            .with("Location", "Austin")
            .with("remote", true);
        assert!(filter.matches(&metadata(json!({"Location": "Austin", "remote": true}))));
        assert!(!filter.matches(&metadata(json!({"Location": "Austin", "remote": false}))));
        assert!(!filter.matches(&metadata(json!({"Location": "Austin"}))));
    }

    #[test]
    fn test_filter_equality_is_exact() {
        let filter = MetadataFilter::new().with("Location", "Austin");
        assert!(!filter.matches(&metadata(json!({"Location": "austin"}))));
        assert!(!filter.matches(&metadata(json!({"Location": "Austin, TX"}))));
    }

    #[test]
    fn test_filter_numbers_compare_by_value() {
        let filter = MetadataFilter::from_value(json!({"level": 3})).unwrap();
        assert!(filter.matches(&metadata(json!({"level": 3.0}))));
        assert!(filter.matches(&metadata(json!({"level": 3}))));
        assert!(!filter.matches(&metadata(json!({"level": 3.5}))));
        assert!(!filter.matches(&metadata(json!({"level": "3"}))));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MetadataFilter::from_value(json!({})).unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches(&JobMetadata::default()));
    }

    #[test]
    fn test_filter_from_value_rejects_non_scalars() {
        let err = MetadataFilter::from_value(json!({"skills": ["Rust"]})).unwrap_err();
        assert!(matches!(err, MatchError::InvalidArgument(_)));
        let err = MetadataFilter::from_value(json!(["Location", "Austin"])).unwrap_err();
        assert!(matches!(err, MatchError::InvalidArgument(_)));
    }

    #[test]
    fn test_filter_to_json_preserves_constraints() {
        let filter = MetadataFilter::from_value(json!({"Location": "Austin", "level": 3})).unwrap();
        assert_eq!(filter.constraints().len(), 2);
        assert_eq!(filter.to_json(), json!({"Location": "Austin", "level": 3}));
    }

    #[test]
    fn test_job_record_deserializes_without_metadata() {
        let record: JobRecord =
            serde_json::from_value(json!({"id": "job9", "embedding": [1.0, 0.0]})).unwrap();
        assert_eq!(record.id, "job9");
        assert_eq!(record.embedding.dimension(), 2);
        assert!(record.metadata.as_map().is_empty());
    }
}

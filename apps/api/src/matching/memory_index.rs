//! In-process job index loaded once from a JSON Lines file.
//!
//! Each line: `{"id": "...", "embedding": [f32, ...], "metadata": {...}}`.
//! Queries are exact (brute-force cosine over every record passing the filter),
//! which is fine for the few thousand postings a single collection holds.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::matching::embedding::EmbeddingVector;
use crate::matching::index::{JobIndex, JobRecord, MetadataFilter, ScoreKind, ScoredJob};
use crate::matching::MatchError;

pub struct MemoryIndex {
    records: Vec<JobRecord>,
    dimension: Option<usize>,
}

impl MemoryIndex {
    /// Validates ids and dimensionality. Every record must share one dimension.
    pub fn from_records(records: Vec<JobRecord>) -> Result<Self, MatchError> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut dimension: Option<usize> = None;

        for record in &records {
            if record.id.trim().is_empty() {
                return Err(MatchError::InvalidArgument(
                    "job record with empty id".to_string(),
                ));
            }
            if !seen.insert(record.id.as_str()) {
                return Err(MatchError::InvalidArgument(format!(
                    "duplicate job id '{}'",
                    record.id
                )));
            }
            let dim = record.embedding.dimension();
            match dimension {
                None => dimension = Some(dim),
                Some(expected) if expected != dim => {
                    return Err(MatchError::InvalidArgument(format!(
                        "job '{}' has {dim} dimensions, expected {expected}",
                        record.id
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(Self { records, dimension })
    }

    /// Reads a JSON Lines file. Blank lines are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job index file '{}'", path.display()))?;

        let mut records = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: JobRecord = serde_json::from_str(line).with_context(|| {
                format!("Invalid job record at {}:{}", path.display(), line_no + 1)
            })?;
            records.push(record);
        }

        let index = Self::from_records(records)
            .with_context(|| format!("Invalid job index file '{}'", path.display()))?;
        info!(
            "Loaded {} job records from {} (dimension: {:?})",
            index.records.len(),
            path.display(),
            index.dimension
        );
        Ok(index)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[async_trait]
impl JobIndex for MemoryIndex {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn score_kind(&self) -> ScoreKind {
        ScoreKind::Similarity
    }

    async fn len(&self) -> Result<usize, MatchError> {
        Ok(self.records.len())
    }

    async fn query(
        &self,
        vector: &EmbeddingVector,
        top_k: NonZeroUsize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredJob>, MatchError> {
        let Some(dimension) = self.dimension else {
            return Err(MatchError::EmptyIndex);
        };
        if vector.dimension() != dimension {
            return Err(MatchError::InvalidArgument(format!(
                "query vector has {} dimensions, index has {dimension}",
                vector.dimension()
            )));
        }

        let mut hits: Vec<ScoredJob> = self
            .records
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| ScoredJob {
                raw_score: vector.cosine_similarity(&r.embedding),
                record: r.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.raw_score
                .total_cmp(&a.raw_score)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        hits.truncate(top_k.get());

        debug!(
            candidates = self.records.len(),
            returned = hits.len(),
            "Memory index query complete"
        );
        Ok(hits)
    }
}

//! Postgres + pgvector job index.
//!
//! Schema: `migrations/0001_job_postings.sql`. Rows are written by the ingestion job;
//! this module only reads. Ranking uses pgvector's `<=>` operator, which returns cosine
//! **distance** (0 = identical), so this backend reports `ScoreKind::Distance`.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::matching::embedding::EmbeddingVector;
use crate::matching::index::{
    JobIndex, JobMetadata, JobRecord, MetadataFilter, ScoreKind, ScoredJob,
};
use crate::matching::MatchError;

const QUERY_SQL: &str = r#"
    SELECT id,
           embedding::real[] AS embedding,
           metadata,
           (embedding <=> $1::vector)::real AS distance
    FROM job_postings
    WHERE collection = $2
      AND metadata @> $3::jsonb
    ORDER BY distance ASC, id ASC
    LIMIT $4
"#;

const COUNT_SQL: &str = "SELECT COUNT(*) FROM job_postings WHERE collection = $1";

#[derive(Debug, FromRow)]
struct JobPostingRow {
    id: String,
    embedding: Vec<f32>,
    metadata: Value,
    distance: f32,
}

impl JobPostingRow {
    fn into_scored(self) -> ScoredJob {
        let metadata = match self.metadata {
            Value::Object(map) => JobMetadata::new(map),
            _ => JobMetadata::default(),
        };
        ScoredJob {
            record: JobRecord {
                id: self.id,
                embedding: EmbeddingVector::new(self.embedding),
                metadata,
            },
            raw_score: self.distance,
        }
    }
}

pub struct PgIndex {
    pool: PgPool,
    collection: String,
    dimension: usize,
}

impl PgIndex {
    pub fn new(pool: PgPool, collection: String, dimension: usize) -> Self {
        Self {
            pool,
            collection,
            dimension,
        }
    }
}

#[async_trait]
impl JobIndex for PgIndex {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn score_kind(&self) -> ScoreKind {
        ScoreKind::Distance
    }

    async fn len(&self) -> Result<usize, MatchError> {
        let count: i64 = sqlx::query_scalar(COUNT_SQL)
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(count.max(0) as usize)
    }

    async fn query(
        &self,
        vector: &EmbeddingVector,
        top_k: NonZeroUsize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredJob>, MatchError> {
        if vector.dimension() != self.dimension {
            return Err(MatchError::InvalidArgument(format!(
                "query vector has {} dimensions, collection '{}' has {}",
                vector.dimension(),
                self.collection,
                self.dimension
            )));
        }

        let containment = filter
            .map(MetadataFilter::to_json)
            .unwrap_or_else(|| Value::Object(Default::default()));
        let limit = i64::try_from(top_k.get()).unwrap_or(i64::MAX);

        let rows: Vec<JobPostingRow> = sqlx::query_as(QUERY_SQL)
            .bind(vector_literal(vector))
            .bind(&self.collection)
            .bind(Json(containment))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        if rows.is_empty() && self.len().await? == 0 {
            return Err(MatchError::EmptyIndex);
        }

        debug!(
            collection = %self.collection,
            returned = rows.len(),
            "pgvector query complete"
        );
        Ok(rows.into_iter().map(JobPostingRow::into_scored).collect())
    }
}

fn unavailable(e: sqlx::Error) -> MatchError {
    MatchError::IndexUnavailable(e.to_string())
}

/// pgvector text input format: `[0.1,0.2,...]`.
fn vector_literal(vector: &EmbeddingVector) -> String {
    let parts: Vec<String> = vector.as_slice().iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

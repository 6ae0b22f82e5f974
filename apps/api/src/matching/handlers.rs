//! Axum route handlers for the Matching API.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::index::{MetadataFilter, ScoreKind};
use crate::matching::output::{to_keyed_output, to_output, JobRecommendation};
use crate::matching::profile::{Profile, ProfileInput};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    /// A JSON object, or a string holding (possibly brace-less) JSON or free text.
    pub profile: Value,
    pub top_k: Option<i64>,
    pub filters: Option<Value>,
    /// Return `{"job1": {...}, ...}` instead of a list.
    #[serde(default)]
    pub keyed: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MatchOutput {
    Flat(Vec<JobRecommendation>),
    Keyed(Map<String, Value>),
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub results: MatchOutput,
}

#[derive(Debug, Serialize)]
pub struct IndexStatusResponse {
    pub collection: String,
    pub backend: &'static str,
    pub score_kind: ScoreKind,
    pub records: usize,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline entry shared by every transport
// ────────────────────────────────────────────────────────────────────────────

/// Runs match → format for one profile inside a span tagged with `run_id`.
pub async fn run_match(
    state: &AppState,
    run_id: Uuid,
    profile: &Profile,
    top_k: Option<i64>,
    filter: Option<&MetadataFilter>,
    keyed: bool,
) -> Result<MatchOutput, AppError> {
    let top_k = top_k.unwrap_or(state.config.default_top_k);
    let span = info_span!("match_run", %run_id, top_k);

    async move {
        let ranked = state.matcher.find_matches(profile, top_k, filter).await?;
        info!(results = ranked.len(), "Returning recommendations");
        Ok(if keyed {
            MatchOutput::Keyed(to_keyed_output(&ranked))
        } else {
            MatchOutput::Flat(to_output(&ranked))
        })
    }
    .instrument(span)
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/matches
///
/// Ranks indexed job postings against an already-extracted resume profile.
pub async fn handle_match(
    State(state): State<AppState>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Json<MatchResponse>, AppError> {
    let Json(request) = payload?;
    let profile = ProfileInput::from_value(request.profile)?.resolve();
    let filter = request
        .filters
        .map(MetadataFilter::from_value)
        .transpose()?
        .filter(|f| !f.is_empty());

    let run_id = Uuid::new_v4();
    let results = run_match(
        &state,
        run_id,
        &profile,
        request.top_k,
        filter.as_ref(),
        request.keyed,
    )
    .await?;

    Ok(Json(MatchResponse {
        run_id,
        generated_at: Utc::now(),
        results,
    }))
}

/// GET /api/v1/index/status
///
/// Reports the configured collection and the score convention of its backend.
pub async fn handle_index_status(
    State(state): State<AppState>,
) -> Result<Json<IndexStatusResponse>, AppError> {
    let index = state.matcher.index();
    let embedder = state.matcher.embedder();
    let records = index.len().await?;

    Ok(Json(IndexStatusResponse {
        collection: state.config.job_collection.clone(),
        backend: index.backend(),
        score_kind: index.score_kind(),
        records,
        embedding_model: embedder.model_name().to_string(),
        embedding_dimension: embedder.dimension(),
    }))
}

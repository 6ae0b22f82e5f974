//! Axum route handlers for the Resume API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::handlers::{run_match, MatchOutput};
use crate::matching::index::MetadataFilter;
use crate::matching::matcher::validate_top_k;
use crate::matching::profile::Profile;
use crate::resume::{extract_pdf_text, extract_profile};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResumeMatchResponse {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// The profile the LLM extracted, echoed so the caller can see what was matched.
    pub profile: Profile,
    pub results: MatchOutput,
}

/// Parsed multipart form. Only `file` is required.
#[derive(Debug, Default)]
struct ResumeUpload {
    file: Option<Bytes>,
    top_k: Option<i64>,
    filters: Option<Value>,
    keyed: bool,
}

/// POST /api/v1/resumes/match
///
/// Multipart fields: `file` (PDF), optional `top_k`, `filters` (JSON object), `keyed`.
pub async fn handle_resume_match(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResumeMatchResponse>, AppError> {
    let Some(llm) = state.llm.as_ref() else {
        return Err(AppError::NotImplemented(
            "Resume upload requires ANTHROPIC_API_KEY; submit an extracted profile to /api/v1/matches instead".to_string(),
        ));
    };

    let upload = read_upload(multipart).await?;
    // Reject bad arguments before paying for PDF parsing and the LLM call.
    if let Some(top_k) = upload.top_k {
        validate_top_k(top_k)?;
    }
    let file = upload
        .file
        .ok_or_else(|| AppError::Validation("multipart field 'file' is required".to_string()))?;
    let filter = upload
        .filters
        .map(MetadataFilter::from_value)
        .transpose()?;

    let text = extract_pdf_text(file).await?;
    let profile = extract_profile(&text, llm).await?;

    let run_id = Uuid::new_v4();
    let results = run_match(
        &state,
        run_id,
        &profile,
        upload.top_k,
        filter.as_ref(),
        upload.keyed,
    )
    .await?;

    Ok(Json(ResumeMatchResponse {
        run_id,
        generated_at: Utc::now(),
        profile,
        results,
    }))
}

async fn read_upload(mut multipart: Multipart) -> Result<ResumeUpload, AppError> {
    let mut upload = ResumeUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => upload.file = Some(field.bytes().await.map_err(bad_multipart)?),
            "top_k" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                upload.top_k = Some(parse_top_k(&raw)?);
            }
            "filters" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                upload.filters = Some(serde_json::from_str(&raw).map_err(|e| {
                    AppError::Validation(format!("'filters' is not valid JSON: {e}"))
                })?);
            }
            "keyed" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                upload.keyed = matches!(raw.trim(), "true" | "1");
            }
            // Unknown fields are drained and ignored.
            _ => {}
        }
    }

    Ok(upload)
}

fn parse_top_k(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("top_k must be an integer, got '{raw}'")))
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::Validation(format!("invalid multipart body: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_k_accepts_integers() {
        assert_eq!(parse_top_k(" 3 ").unwrap(), 3);
        // Range checks happen in the matcher, so negatives pass through here.
        assert_eq!(parse_top_k("-1").unwrap(), -1);
    }

    #[test]
    fn test_parse_top_k_rejects_text() {
        assert!(matches!(parse_top_k("five"), Err(AppError::Validation(_))));
    }
}

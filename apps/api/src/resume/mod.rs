//! Resume intake: PDF text extraction followed by LLM profile extraction.
//! Text extraction is CPU-bound and must run inside `tokio::task::spawn_blocking`.

pub mod handlers;
pub mod prompts;

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::matching::profile::{Profile, ProfileInput};
use crate::resume::prompts::{PROFILE_EXTRACT_PROMPT, PROFILE_EXTRACT_SYSTEM};

/// Upper bound on resume text sent to the LLM. Longer text is cut at a char boundary.
pub const MAX_RESUME_CHARS: usize = 20_000;

const PDF_MAGIC: &[u8] = b"%PDF-";

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Extracts plain text from an uploaded PDF.
///
/// Fails with `UnprocessableEntity` when the upload is empty, is not a PDF, or
/// yields no text (scanned image-only documents).
pub async fn extract_pdf_text(pdf: Bytes) -> Result<String, AppError> {
    if pdf.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "uploaded resume is empty".to_string(),
        ));
    }
    if !is_pdf(&pdf) {
        return Err(AppError::UnprocessableEntity(
            "uploaded resume is not a PDF".to_string(),
        ));
    }

    let size = pdf.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF extraction: {e}"))
        })?
        .map_err(|e| AppError::UnprocessableEntity(format!("could not read PDF: {e}")))?;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "resume PDF contains no extractable text".to_string(),
        ));
    }

    debug!(
        bytes = size,
        chars = text.chars().count(),
        "Extracted resume text"
    );
    Ok(text)
}

/// Asks the LLM for the five profile fields and resolves its answer like any
/// other structured profile.
pub async fn extract_profile(resume_text: &str, llm: &LlmClient) -> Result<Profile, AppError> {
    let prompt = PROFILE_EXTRACT_PROMPT.replace(
        "{resume_text}",
        truncate_chars(resume_text, MAX_RESUME_CHARS),
    );
    let extracted: Value = llm
        .call_json(&prompt, PROFILE_EXTRACT_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Failed to extract resume profile: {e}")))?;

    let profile = ProfileInput::from_value(extracted)
        .map_err(|e| AppError::Llm(format!("Resume extraction returned an unusable shape: {e}")))?
        .resolve();

    info!(
        role = profile.role.as_deref().unwrap_or(""),
        skills = profile.skills.len(),
        "Extracted resume profile"
    );
    Ok(profile)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

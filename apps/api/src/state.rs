use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::matching::matcher::Matcher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the long-lived embedder and the read-only job index.
    pub matcher: Matcher,
    /// Present only when `ANTHROPIC_API_KEY` is configured; gates resume upload.
    pub llm: Option<LlmClient>,
    pub config: Config,
}

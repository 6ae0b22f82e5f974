//! Remote sentence-embedding client.
//!
//! Speaks the OpenAI-compatible `/embeddings` body that self-hosted servers
//! (text-embeddings-inference, infinity, Ollama) accept:
//! request `{"model", "input": [text]}`, response `{"data": [{"embedding": [...]}]}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::matching::embedding::{ensure_embeddable, Embedder, EmbeddingVector};
use crate::matching::MatchError;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Sleep before the second attempt; doubles before each later one.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a long-lived HTTP client.
/// Retries on transport errors, 429 and 5xx with exponential backoff.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
    dimension: usize,
    backoff: Duration,
}

impl HttpEmbedder {
    pub fn new(url: String, model: String, dimension: usize) -> Result<Self, MatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                MatchError::EmbeddingUnavailable(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            url,
            model,
            dimension,
            backoff: RETRY_BACKOFF,
        })
    }

    #[cfg(test)]
    fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn unavailable(&self, detail: impl std::fmt::Display) -> MatchError {
        MatchError::EmbeddingUnavailable(format!("{} ({}): {detail}", self.model, self.url))
    }

    fn extract_vector(&self, response: EmbeddingResponse) -> Result<EmbeddingVector, MatchError> {
        let datum = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| self.unavailable("response contained no embeddings"))?;

        if datum.embedding.len() != self.dimension {
            return Err(self.unavailable(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                datum.embedding.len()
            )));
        }
        Ok(EmbeddingVector::new(datum.embedding))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector, MatchError> {
        ensure_embeddable(text)?;

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let mut last_error: Option<MatchError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, then 2s
                let delay = self.backoff * (1 << (attempt - 1));
                warn!(
                    "Embedding attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&self.url).json(&request_body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(self.unavailable(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Embedding server returned {}: {}", status, body);
                last_error = Some(self.unavailable(format!("status {status}")));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(self.unavailable(format!("status {status}: {body}")));
            }

            let parsed: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| self.unavailable(format!("unreadable response: {e}")))?;

            let vector = self.extract_vector(parsed)?;
            debug!(dimension = vector.dimension(), "Embedding call succeeded");
            return Ok(vector);
        }

        Err(last_error.unwrap_or_else(|| self.unavailable("retries exhausted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Scripted embedding server: answers each request with the next queued reply.
    #[derive(Clone)]
    struct ScriptedServer {
        replies: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
        hits: Arc<AtomicUsize>,
    }

    async fn scripted_reply(State(server): State<ScriptedServer>) -> (StatusCode, Json<Value>) {
        server.hits.fetch_add(1, Ordering::SeqCst);
        let next = server.replies.lock().unwrap().pop_front();
        let (status, body) = next.unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, json!({})));
        (status, Json(body))
    }

    async fn serve(replies: Vec<(StatusCode, Value)>) -> (String, Arc<AtomicUsize>) {
        let server = ScriptedServer {
            replies: Arc::new(Mutex::new(replies.into())),
            hits: Arc::new(AtomicUsize::new(0)),
        };
        let hits = server.hits.clone();
        let app = Router::new()
            .route("/embeddings", post(scripted_reply))
            .with_state(server);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/embeddings"), hits)
    }

    fn fast_embedder(url: String) -> HttpEmbedder {
        HttpEmbedder::new(url, "test-model".to_string(), 2)
            .unwrap()
            .with_backoff(Duration::from_millis(5))
    }

    fn ok_body() -> (StatusCode, Value) {
        (StatusCode::OK, json!({"data": [{"embedding": [0.6, 0.8]}]}))
    }

    fn unavailable() -> (StatusCode, Value) {
        (StatusCode::SERVICE_UNAVAILABLE, json!({"error": "loading model"}))
    }

    fn embedder(dimension: usize) -> HttpEmbedder {
        HttpEmbedder::new(
            "http://127.0.0.1:9/embeddings".to_string(),
            "test-model".to_string(),
            dimension,
        )
        .unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = EmbeddingRequest {
            model: "all-MiniLM-L6-v2",
            input: ["role: Engineer"],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"model": "all-MiniLM-L6-v2", "input": ["role: Engineer"]})
        );
    }

    #[test]
    fn test_extract_vector_takes_first_embedding() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"object": "list", "data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}]}"#,
        )
        .unwrap();
        let v = embedder(3).extract_vector(response).unwrap();
        assert_eq!(v.as_slice(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_extract_vector_rejects_dimension_mismatch() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"embedding": [0.1, 0.2]}]}"#).unwrap();
        let err = embedder(384).extract_vector(response).unwrap_err();
        assert!(matches!(err, MatchError::EmbeddingUnavailable(_)));
        assert!(err.to_string().contains("expected 384 dimensions, got 2"));
    }

    #[test]
    fn test_extract_vector_rejects_empty_data() {
        let response: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(embedder(3).extract_vector(response).is_err());
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_success() {
        let (url, hits) = serve(vec![unavailable(), ok_body()]).await;
        let vector = fast_embedder(url).embed("role: SRE").await.unwrap();
        assert_eq!(vector.as_slice(), &[0.6, 0.8]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let rate_limited = (StatusCode::TOO_MANY_REQUESTS, json!({}));
        let (url, hits) = serve(vec![rate_limited, ok_body()]).await;
        assert!(fast_embedder(url).embed("role: SRE").await.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_fails_after_one_request() {
        let rejected = (StatusCode::BAD_REQUEST, json!({"error": "bad model"}));
        let (url, hits) = serve(vec![rejected, ok_body()]).await;
        let err = fast_embedder(url).embed("role: SRE").await.unwrap_err();
        assert!(matches!(err, MatchError::EmbeddingUnavailable(_)));
        assert!(err.to_string().contains("400"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_stop_after_three_attempts() {
        let replies = vec![unavailable(), unavailable(), unavailable(), ok_body()];
        let (url, hits) = serve(replies).await;
        let err = fast_embedder(url).embed("role: SRE").await.unwrap_err();
        assert!(matches!(err, MatchError::EmbeddingUnavailable(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = fast_embedder(format!("http://{addr}/embeddings"))
            .embed("role: SRE")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_text_fails_without_network() {
        let err = embedder(3).embed("  ").await.unwrap_err();
        assert!(matches!(err, MatchError::EmbeddingUnavailable(_)));
    }
}

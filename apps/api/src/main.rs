mod config;
mod db;
mod errors;
mod llm_client;
mod matching;
mod resume;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, EmbeddingBackend, IndexBackend};
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::matching::embedding::Embedder;
use crate::matching::hash_embedder::HashEmbedder;
use crate::matching::http_embedder::HttpEmbedder;
use crate::matching::index::JobIndex;
use crate::matching::matcher::Matcher;
use crate::matching::memory_index::MemoryIndex;
use crate::matching::pg_index::PgIndex;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparsable env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobMatch API v{}", env!("CARGO_PKG_VERSION"));

    // The embedder is built once and shared by every request
    let embedder = build_embedder(&config)?;
    info!(
        "Embedder initialized (model: {}, dimension: {})",
        embedder.model_name(),
        embedder.dimension()
    );

    let index = build_index(&config).await?;
    info!(
        "Job index initialized (backend: {}, collection: {})",
        index.backend(),
        config.job_collection
    );

    // Resume upload is optional
    let llm = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone()).context("Failed to build LLM client")?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(llm)
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; /api/v1/resumes/match will answer 501");
            None
        }
    };

    let state = AppState {
        matcher: Matcher::new(embedder, index),
        llm,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match &config.embedding_backend {
        EmbeddingBackend::Http { url } => Arc::new(HttpEmbedder::new(
            url.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?),
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(config.embedding_dimension)),
    };
    Ok(embedder)
}

async fn build_index(config: &Config) -> Result<Arc<dyn JobIndex>> {
    let index: Arc<dyn JobIndex> = match &config.index_backend {
        IndexBackend::File { path } => {
            let index = MemoryIndex::load(path)?;
            match index.dimension() {
                Some(dim) if dim != config.embedding_dimension => warn!(
                    "Job index dimension {dim} differs from EMBEDDING_DIMENSION {}; queries will be rejected",
                    config.embedding_dimension
                ),
                None => warn!("Job index at {} is empty", path.display()),
                _ => {}
            }
            Arc::new(index)
        }
        IndexBackend::Postgres { database_url } => {
            let pool = create_pool(database_url).await?;
            Arc::new(PgIndex::new(
                pool,
                config.job_collection.clone(),
                config.embedding_dimension,
            ))
        }
    };
    Ok(index)
}

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Where job postings are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBackend {
    /// JSON Lines file loaded into memory at startup.
    File { path: PathBuf },
    /// pgvector table reached through `DATABASE_URL`.
    Postgres { database_url: String },
}

/// Which embedding provider to construct at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Http { url: String },
    Hash,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or unparsable.
#[derive(Debug, Clone)]
pub struct Config {
    pub index_backend: IndexBackend,
    pub job_collection: String,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub default_top_k: i64,
    /// Enables resume upload; the endpoint answers 501 without it.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let index_backend = match var("JOB_INDEX_BACKEND", "file").as_str() {
            "file" => IndexBackend::File {
                path: PathBuf::from(var("JOB_INDEX_PATH", "data/jobs.jsonl")),
            },
            "postgres" => IndexBackend::Postgres {
                database_url: lookup("DATABASE_URL").context(
                    "Required environment variable 'DATABASE_URL' is not set (JOB_INDEX_BACKEND=postgres)",
                )?,
            },
            other => bail!("JOB_INDEX_BACKEND must be 'file' or 'postgres', got '{other}'"),
        };

        let embedding_backend = match var("EMBEDDING_BACKEND", "http").as_str() {
            "http" => EmbeddingBackend::Http {
                url: var("EMBEDDING_URL", "http://localhost:7997/embeddings"),
            },
            "hash" => EmbeddingBackend::Hash,
            other => bail!("EMBEDDING_BACKEND must be 'http' or 'hash', got '{other}'"),
        };

        let embedding_dimension = var("EMBEDDING_DIMENSION", "384")
            .parse::<usize>()
            .context("EMBEDDING_DIMENSION must be a positive integer")?;
        if embedding_dimension == 0 {
            bail!("EMBEDDING_DIMENSION must be a positive integer");
        }

        let default_top_k = var("DEFAULT_TOP_K", "5")
            .parse::<i64>()
            .context("DEFAULT_TOP_K must be an integer")?;
        if default_top_k <= 0 {
            bail!("DEFAULT_TOP_K must be positive, got {default_top_k}");
        }

        Ok(Config {
            index_backend,
            job_collection: var("JOB_COLLECTION", "jobs"),
            embedding_backend,
            embedding_model: var("EMBEDDING_MODEL", "sentence-transformers/all-MiniLM-L6-v2"),
            embedding_dimension,
            default_top_k,
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()),
            port: var("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG", "info"),
        })
    }
}

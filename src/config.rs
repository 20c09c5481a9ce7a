//! Pipeline configuration.
//!
//! [`RagConfig`] carries the handful of knobs the core recognizes: model
//! names for the two remote services, the chunk size, the retrieval depth,
//! and the vector index name. Values resolve in two layers: compiled
//! defaults (matching the reference deployment), then `RAGCOUNSEL_*`
//! environment variables via [`RagConfig::from_env`].

use std::env;

use serde::{Deserialize, Serialize};

use crate::types::RagError;

/// Default embedding model name.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Default chat-completion model name.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";
/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default number of chunks retrieved per question.
pub const DEFAULT_TOP_K: usize = 3;
/// Default vector index / collection name.
pub const DEFAULT_INDEX_NAME: &str = "legal-info";

/// Configuration recognized by the pipeline core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RagConfig {
    /// Embedding model requested from the embedding service.
    pub embedding_model: String,
    /// Chat model requested from the completion service.
    pub completion_model: String,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Number of nearest chunks retrieved per question.
    pub top_k: usize,
    /// Vector-store index or collection name.
    pub index_name: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            index_name: DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

impl RagConfig {
    /// Builds a configuration from the environment, falling back to the
    /// compiled defaults for anything unset.
    ///
    /// Recognized variables: `RAGCOUNSEL_EMBEDDING_MODEL`,
    /// `RAGCOUNSEL_COMPLETION_MODEL`, `RAGCOUNSEL_CHUNK_SIZE`,
    /// `RAGCOUNSEL_TOP_K`, `RAGCOUNSEL_INDEX`. A `.env` file in the
    /// working directory is loaded first if present.
    pub fn from_env() -> Result<Self, RagError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let embedding_model = env::var("RAGCOUNSEL_EMBEDDING_MODEL")
            .unwrap_or_else(|_| defaults.embedding_model);
        let completion_model = env::var("RAGCOUNSEL_COMPLETION_MODEL")
            .unwrap_or_else(|_| defaults.completion_model);
        let index_name = env::var("RAGCOUNSEL_INDEX").unwrap_or_else(|_| defaults.index_name);

        let chunk_size = parse_positive("RAGCOUNSEL_CHUNK_SIZE", defaults.chunk_size)?;
        let top_k = parse_positive("RAGCOUNSEL_TOP_K", defaults.top_k)?;

        Ok(Self {
            embedding_model,
            completion_model,
            chunk_size,
            top_k,
            index_name,
        })
    }
}

fn parse_positive(key: &str, default: usize) -> Result<usize, RagError> {
    match env::var(key) {
        Ok(raw) => {
            let value: usize = raw
                .parse()
                .map_err(|_| RagError::Config(format!("{key} must be an integer, got '{raw}'")))?;
            if value == 0 {
                return Err(RagError::Config(format!("{key} must be at least 1")));
            }
            Ok(value)
        }
        Err(_) => Ok(default),
    }
}

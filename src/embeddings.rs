//! Embedding service clients.
//!
//! [`EmbeddingClient`] is the seam between the pipeline and the remote
//! embedding service: one text in, one fixed-dimension vector out. The
//! core assumes nothing about batching; callers that want throughput can
//! batch on their side, but per-chunk calls keep partial-failure
//! attribution exact during ingestion.
//!
//! Two implementations ship with the crate:
//!
//! - [`OpenAiEmbeddingClient`]: talks to an OpenAI-compatible
//!   `/embeddings` endpoint over HTTPS.
//! - [`MockEmbeddingClient`]: deterministic hash-derived vectors for
//!   tests and offline runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RagError;

/// Default base URL for the OpenAI-compatible embedding endpoint.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1/";

/// Maps text to a fixed-dimension embedding vector.
///
/// Implementations must be safe to call concurrently. Remote failures are
/// reported as [`RagError::Embedding`]; the trait contract includes no
/// internal retry; retry policy belongs to the caller.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// Client for an OpenAI-compatible embedding API.
#[derive(Clone, Debug)]
pub struct OpenAiEmbeddingClient {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Creates a client against the given base URL (e.g.
    /// `https://api.openai.com/v1`).
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, RagError> {
        Ok(Self {
            client: Client::new(),
            base_url: parse_base_url(base_url.as_ref())?,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Creates a client against the public OpenAI endpoint.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, RagError> {
        Self::new(DEFAULT_OPENAI_BASE_URL, api_key, model)
    }

    /// Model name sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let endpoint = self
            .base_url
            .join("embeddings")
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        body.data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| RagError::Embedding("response contained no embedding".to_string()))
    }
}

/// Deterministic embedding client for tests and offline runs.
///
/// Vectors are derived by hashing the input text, so identical text always
/// produces an identical vector and distinct texts almost always differ.
/// [`with_failure_marker`](Self::with_failure_marker) turns the client
/// into a fault injector: any input containing the marker fails with
/// [`RagError::Embedding`], which is how the batch-isolation behavior of
/// the reindex orchestrator gets tested.
#[derive(Clone, Debug)]
pub struct MockEmbeddingClient {
    dimensions: usize,
    failure_marker: Option<String>,
}

impl Default for MockEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingClient {
    pub fn new() -> Self {
        Self {
            dimensions: 8,
            failure_marker: None,
        }
    }

    /// Sets the vector dimension (default 8).
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions.max(1);
        self
    }

    /// Any input containing `marker` will fail to embed.
    #[must_use]
    pub fn with_failure_marker(mut self, marker: impl Into<String>) -> Self {
        self.failure_marker = Some(marker.into());
        self
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if let Some(marker) = &self.failure_marker {
            if text.contains(marker.as_str()) {
                return Err(RagError::Embedding(format!(
                    "injected failure for text containing '{marker}'"
                )));
            }
        }
        Ok(hash_to_vec(text, self.dimensions))
    }
}

fn hash_to_vec(text: &str, dimensions: usize) -> Vec<f32> {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dimensions)
        .map(|i| {
            let bits = seed.rotate_left((i as u32) * 7) ^ ((i as u64) << 24);
            (bits as f32) / (u64::MAX as f32)
        })
        .collect()
}

/// Normalizes a service base URL so that relative joins keep the full
/// path (a missing trailing slash would otherwise drop the last segment).
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, RagError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|err| RagError::Config(format!("invalid base URL '{raw}': {err}")))
}

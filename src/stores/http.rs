//! Remote REST vector index adapter.
//!
//! Speaks the wire shape popularized by hosted vector databases: vectors
//! are upserted in batches of `{id, values, metadata}`, queries send a raw
//! vector with `topK`/`includeMetadata`, and deletion takes a metadata
//! filter. The concrete service is swappable: anything that answers these
//! three endpoints under a common base URL works:
//!
//! - `POST {base}/vectors/upsert`
//! - `POST {base}/query`
//! - `POST {base}/vectors/delete`
//!
//! All failures surface as [`RagError::VectorStore`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ChunkMetadata, QueryMatch, VectorIndex, VectorRecord};
use crate::embeddings::parse_base_url;
use crate::types::RagError;

#[derive(Clone)]
pub struct HttpVectorIndex {
    client: Client,
    base_url: Url,
    api_key: String,
    namespace: Option<String>,
}

impl HttpVectorIndex {
    /// Creates an adapter for the index hosted at `base_url`.
    pub fn new(base_url: impl AsRef<str>, api_key: impl Into<String>) -> Result<Self, RagError> {
        Ok(Self {
            client: Client::new(),
            base_url: parse_base_url(base_url.as_ref())?,
            api_key: api_key.into(),
            namespace: None,
        })
    }

    /// Scopes all operations to a named namespace / collection within the
    /// index. Typically wired from [`RagConfig::index_name`](crate::config::RagConfig).
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, RagError> {
        self.base_url
            .join(path)
            .map_err(|err| RagError::VectorStore(err.to_string()))
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, RagError> {
        self.client
            .post(self.endpoint(path)?)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::VectorStore(err.to_string()))
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a ChunkMetadata,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    score: f32,
    metadata: Option<ChunkMetadata>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    filter: SourceFilter<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct SourceFilter<'a> {
    source_id: EqFilter<'a>,
}

#[derive(Serialize)]
struct EqFilter<'a> {
    #[serde(rename = "$eq")]
    eq: &'a str,
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(&self, record: VectorRecord) -> Result<(), RagError> {
        let request = UpsertRequest {
            vectors: vec![WireVector {
                id: &record.id,
                values: &record.embedding,
                metadata: &record.metadata,
            }],
            namespace: self.namespace.as_deref(),
        };
        self.post("vectors/upsert", &request).await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, RagError> {
        let request = QueryRequest {
            vector: embedding,
            top_k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };
        let response = self.post("query", &request).await?;
        let body: QueryResponse = response
            .json()
            .await
            .map_err(|err| RagError::VectorStore(err.to_string()))?;

        // Matches without metadata carry no retrievable text; skip them.
        Ok(body
            .matches
            .into_iter()
            .filter_map(|m| {
                let metadata = m.metadata?;
                Some(QueryMatch {
                    text: metadata.text,
                    source_id: metadata.source_id,
                    score: m.score,
                })
            })
            .collect())
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<(), RagError> {
        let request = DeleteRequest {
            filter: SourceFilter {
                source_id: EqFilter { eq: source_id },
            },
            namespace: self.namespace.as_deref(),
        };
        self.post("vectors/delete", &request).await?;
        Ok(())
    }
}

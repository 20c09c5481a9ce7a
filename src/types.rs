//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the pipeline surfaces a [`RagError`]. The
//! variants map one-to-one onto the remote collaborators the core talks to
//! (embedding service, vector store, chat completion, metadata store) plus
//! local storage and configuration failures.
//!
//! Propagation policy:
//!
//! - Embedding, vector-store, and completion failures are surfaced to the
//!   immediate caller; the core never retries internally.
//! - A mid-loop ingestion failure is wrapped in [`RagError::Ingestion`],
//!   which records the chunk index where the loop stopped. Retrying the
//!   whole `ingest` call is safe because upserts are idempotent.
//! - Best-effort vector removal downgrades [`RagError::VectorStore`] to a
//!   logged warning instead of propagating (see
//!   [`IngestionService::remove`](crate::ingestion::IngestionService::remove)).

use thiserror::Error;

/// Errors produced by the ingestion/retrieval pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// The remote embedding call failed (network, auth, quota, or a
    /// malformed response).
    #[error("embedding service error: {0}")]
    Embedding(String),

    /// A vector-store upsert, query, or delete failed.
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// The chat-completion call failed.
    #[error("completion service error: {0}")]
    Completion(String),

    /// The external metadata store could not be read.
    #[error("metadata store error: {0}")]
    MetadataStore(String),

    /// An `ingest` call failed partway through its chunk loop. Chunks
    /// before `chunk_index` were already written for this attempt.
    #[error("ingestion of '{source_id}' failed at chunk {chunk_index}: {source}")]
    Ingestion {
        source_id: String,
        chunk_index: usize,
        #[source]
        source: Box<RagError>,
    },

    /// Local storage failure (sqlite backend).
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid or unparseable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RagError {
    /// Wraps an error as a partial-ingestion failure at the given chunk.
    pub fn ingestion(source_id: impl Into<String>, chunk_index: usize, source: RagError) -> Self {
        RagError::Ingestion {
            source_id: source_id.into(),
            chunk_index,
            source: Box::new(source),
        }
    }
}

//! Vector index adapters.
//!
//! The pipeline treats the vector store as an opaque service exposing three
//! operations, captured by the [`VectorIndex`] trait:
//!
//! ```text
//!                   ┌──────────────────┐
//!                   │ VectorIndex trait │
//!                   │ upsert / query /  │
//!                   │ delete_by_source  │
//!                   └────────┬─────────┘
//!                            │
//!          ┌─────────────────┼──────────────────┐
//!          ▼                 ▼                  ▼
//!   ┌─────────────┐  ┌──────────────┐  ┌──────────────┐
//!   │  In-memory  │  │  Remote REST │  │    SQLite    │
//!   │ (tests/dev) │  │   (Pinecone- │  │ (sqlite-vec) │
//!   │             │  │    shaped)   │  │              │
//!   └─────────────┘  └──────────────┘  └──────────────┘
//! ```
//!
//! Every vector is keyed by a deterministic id derived from its source
//! document and chunk position (see [`vector_id`]), and carries the chunk
//! text plus `source_id` as metadata. The `source_id` in metadata is what
//! makes [`VectorIndex::delete_by_source`] possible; without it, stale
//! chunks from a shrunk re-ingestion could never be cleaned up.

pub mod http;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::RagError;

pub use http::HttpVectorIndex;
pub use memory::InMemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

/// Deterministic vector id for a chunk of a document.
///
/// Identical `(source_id, chunk_index)` always yields the same id, which
/// is what makes re-ingesting identical text an in-place overwrite rather
/// than an accumulation of duplicates.
pub fn vector_id(source_id: &str, chunk_index: usize) -> String {
    format!("{source_id}_chunk_{chunk_index}")
}

/// Metadata stored alongside each embedding vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// The chunk's raw text, returned verbatim by queries.
    pub text: String,
    /// Stable id of the owning document; the deletion filter key.
    pub source_id: String,
    /// Original file name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// An embedding vector plus its metadata, ready for upsert.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>, metadata: ChunkMetadata) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata,
        }
    }
}

/// One similarity-search hit: the chunk text, its owning document, and the
/// store's relevance score (higher is more similar).
#[derive(Clone, Debug, PartialEq)]
pub struct QueryMatch {
    pub text: String,
    pub source_id: String,
    pub score: f32,
}

/// Adapter over a vector store.
///
/// Implementations must rank [`query`](Self::query) results by descending
/// similarity and must treat [`delete_by_source`](Self::delete_by_source)
/// of an unknown source as a successful no-op.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert-or-replace a single vector, keyed by `record.id`.
    async fn upsert(&self, record: VectorRecord) -> Result<(), RagError>;

    /// Nearest-neighbor search; at most `top_k` matches, best first.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, RagError>;

    /// Removes every vector whose metadata `source_id` matches.
    async fn delete_by_source(&self, source_id: &str) -> Result<(), RagError>;
}

//! ```text
//! Document text ──► chunking::chunk_text ──► bounded chunks
//!                                 │
//!                                 ▼
//!            embeddings::EmbeddingClient (one vector per chunk)
//!                                 │
//!                                 ▼
//! ingestion::IngestionService ──► stores::VectorIndex (upsert by id)
//!          ▲                              │
//!          │                              ▼
//! ingestion::ReindexOrchestrator   retrieval::RetrievalService
//!   (metadata store → remove +            │
//!    re-ingest per document)              ▼
//!                                  answer::AnswerComposer ──► grounded answer
//! ```
//!
//! The crate is the core of a retrieval-augmented legal assistant: it
//! turns source documents into a semantically indexed knowledge base and
//! turns user questions into answers grounded in that base. User accounts,
//! HTTP routing, file storage, and the relational metadata store are
//! external collaborators reached through the trait seams in
//! [`embeddings`], [`completion`], [`stores`], and
//! [`ingestion::reindex::DocumentStore`].
//!
//! Two invariants drive the design:
//!
//! - Vector ids are deterministic per `(source_id, chunk_index)`, so
//!   re-ingesting identical text overwrites in place.
//! - Replacing a changed document is an explicit remove-then-ingest
//!   sequence, never a hidden atomic update. Chunk counts can shrink, and
//!   only deletion by `source_id` guarantees no stale vector survives.

pub mod answer;
pub mod chunking;
pub mod completion;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use answer::AnswerComposer;
pub use chunking::chunk_text;
pub use completion::{CompletionClient, MockCompletionClient, OpenAiCompletionClient};
pub use config::RagConfig;
pub use embeddings::{EmbeddingClient, MockEmbeddingClient, OpenAiEmbeddingClient};
pub use ingestion::{
    DocumentRecord, DocumentStore, IngestionService, ReindexOrchestrator, ReindexOutcome,
    ReindexStatus,
};
pub use retrieval::RetrievalService;
pub use stores::{
    ChunkMetadata, HttpVectorIndex, InMemoryVectorIndex, QueryMatch, SqliteVectorIndex,
    VectorIndex, VectorRecord, vector_id,
};
pub use types::RagError;

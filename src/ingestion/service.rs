//! Ingestion of a single document into the vector index.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chunking::chunk_text;
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::embeddings::EmbeddingClient;
use crate::stores::{ChunkMetadata, VectorIndex, VectorRecord, vector_id};
use crate::types::RagError;

/// Filename recorded in vector metadata when the caller has none.
pub const DEFAULT_FILENAME: &str = "content.txt";

/// Orchestrates chunking, embedding, and vector upserts for one document
/// at a time.
///
/// Holds its collaborators as injected handles rather than process-global
/// clients, so tests can substitute fakes and two services can point at
/// different indexes in the same process.
///
/// # Replacing a document
///
/// Re-ingesting a document that may already be indexed requires calling
/// [`remove`](Self::remove) first and then [`ingest`](Self::ingest):
/// chunk counts can shrink between versions, and a bare re-upsert would
/// leave the old version's high-index vectors orphaned. The two steps are
/// deliberately separate calls. There is no cross-store transaction, and
/// hiding the sequence behind a single "update" would only disguise that.
/// Callers must also serialize concurrent writes to the same `source_id`
/// (typically via the metadata store's row-level update); the service
/// itself takes no locks.
#[derive(Clone)]
pub struct IngestionService {
    embeddings: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    chunk_size: usize,
}

impl IngestionService {
    pub fn new(embeddings: Arc<dyn EmbeddingClient>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embeddings,
            index,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Overrides the chunk size (default 500 characters).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Indexes `text` under `source_id`, recording [`DEFAULT_FILENAME`] in
    /// the vector metadata.
    pub async fn ingest(&self, source_id: &str, text: &str) -> Result<usize, RagError> {
        self.ingest_with_filename(source_id, text, DEFAULT_FILENAME)
            .await
    }

    /// Indexes `text` under `source_id`.
    ///
    /// Empty text is a no-op returning 0; existing vectors for the source
    /// are left untouched; removal is its own operation. Otherwise the
    /// text is chunked and each chunk is embedded and upserted in index
    /// order under its deterministic vector id.
    ///
    /// On a mid-loop failure the call returns [`RagError::Ingestion`]
    /// naming the failed chunk; earlier chunks from this attempt are
    /// already written. Retrying the whole call is safe and convergent
    /// because upserts overwrite in place.
    pub async fn ingest_with_filename(
        &self,
        source_id: &str,
        text: &str,
        filename: &str,
    ) -> Result<usize, RagError> {
        if text.is_empty() {
            debug!(source_id, "ingest skipped: no text content");
            return Ok(0);
        }

        let chunks = chunk_text(text, self.chunk_size);
        for (chunk_index, chunk) in chunks.iter().enumerate() {
            let embedding = self
                .embeddings
                .embed(chunk)
                .await
                .map_err(|err| RagError::ingestion(source_id, chunk_index, err))?;

            let record = VectorRecord::new(
                vector_id(source_id, chunk_index),
                embedding,
                ChunkMetadata {
                    text: chunk.clone(),
                    source_id: source_id.to_string(),
                    filename: Some(filename.to_string()),
                },
            );
            self.index
                .upsert(record)
                .await
                .map_err(|err| RagError::ingestion(source_id, chunk_index, err))?;
            debug!(source_id, chunk_index, "chunk embedded and upserted");
        }

        info!(source_id, chunks = chunks.len(), "document ingested");
        Ok(chunks.len())
    }

    /// Removes every vector stored for `source_id`.
    ///
    /// Best effort: a failed deletion is logged and swallowed rather than
    /// propagated, so cleanup never blocks a surrounding metadata-store
    /// transaction. Removing a source with no vectors is a no-op.
    pub async fn remove(&self, source_id: &str) {
        if let Err(err) = self.index.delete_by_source(source_id).await {
            warn!(source_id, error = %err, "failed to remove vectors; continuing");
        }
    }
}

//! Query-time retrieval: question → nearest chunks → context string.

use std::sync::Arc;

use tracing::debug;

use crate::config::DEFAULT_TOP_K;
use crate::embeddings::EmbeddingClient;
use crate::stores::VectorIndex;
use crate::types::RagError;

/// Embeds a question, fetches the nearest chunks, and assembles them into
/// a context string for the answer composer.
///
/// Chunk texts are joined by newlines in descending-relevance order, as
/// the vector store returned them. Near-duplicate chunks across documents
/// are not deduplicated; with a small `top_k` that is a quality
/// refinement, not a correctness concern.
#[derive(Clone)]
pub struct RetrievalService {
    embeddings: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl RetrievalService {
    pub fn new(embeddings: Arc<dyn EmbeddingClient>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embeddings,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Overrides the retrieval depth (default 3).
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Builds the context for `question` using the configured depth.
    ///
    /// Returns an empty string, not an error, when the index has nothing
    /// relevant: the answer degrades to an ungrounded one instead of the
    /// whole request failing. Embedding or query failures do propagate.
    pub async fn retrieve(&self, question: &str) -> Result<String, RagError> {
        self.retrieve_top(question, self.top_k).await
    }

    /// Builds the context for `question` from at most `top_k` chunks.
    pub async fn retrieve_top(&self, question: &str, top_k: usize) -> Result<String, RagError> {
        let embedding = self.embeddings.embed(question).await?;
        let matches = self.index.query(&embedding, top_k).await?;
        if matches.is_empty() {
            debug!("no matching chunks; returning empty context");
            return Ok(String::new());
        }
        debug!(matches = matches.len(), top = %matches[0].score, "context assembled");
        Ok(matches
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingClient;
    use crate::stores::InMemoryVectorIndex;

    #[tokio::test]
    async fn empty_index_yields_empty_context() {
        let service = RetrievalService::new(
            Arc::new(MockEmbeddingClient::new()),
            Arc::new(InMemoryVectorIndex::new()),
        );
        let context = service.retrieve("any question").await.unwrap();
        assert_eq!(context, "");
    }

    #[tokio::test]
    async fn embedding_failure_propagates() {
        let service = RetrievalService::new(
            Arc::new(MockEmbeddingClient::new().with_failure_marker("POISON")),
            Arc::new(InMemoryVectorIndex::new()),
        );
        let err = service.retrieve("POISON question").await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }
}

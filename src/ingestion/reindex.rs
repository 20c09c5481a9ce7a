//! Full-index rebuild from the external metadata store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::service::IngestionService;
use crate::types::RagError;

/// A document as the external metadata store describes it.
///
/// `text` is `None` for file types the source system never extracted text
/// from (scanned PDFs and the like); those documents are deliberately
/// skipped rather than guessed at during a reindex.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub source_id: String,
    pub display_name: String,
    pub text: Option<String>,
}

/// Read-only seam onto the external metadata store that owns documents.
///
/// The core never polls this store; the surrounding application calls the
/// ingestion service on document create/update/delete, and the reindex
/// orchestrator iterates it on demand.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every known document, with its current plain-text content.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RagError>;

    /// Current text for one document; `None` when the document is unknown
    /// or has no extractable text.
    async fn get_text(&self, source_id: &str) -> Result<Option<String>, RagError>;
}

/// Outcome classification for one document in a reindex run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReindexStatus {
    /// Vectors rebuilt from current text.
    Ok,
    /// Document had no text content; its vectors were removed and nothing
    /// was re-ingested.
    Skipped,
    /// Re-ingestion failed; see the message.
    Error,
}

/// Per-document result of [`ReindexOrchestrator::reindex_all`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReindexOutcome {
    pub source_id: String,
    pub status: ReindexStatus,
    pub message: Option<String>,
}

impl ReindexOutcome {
    fn ok(source_id: impl Into<String>, chunks: usize) -> Self {
        Self {
            source_id: source_id.into(),
            status: ReindexStatus::Ok,
            message: Some(format!("{chunks} chunks")),
        }
    }

    fn skipped(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            status: ReindexStatus::Skipped,
            message: Some("no text content".to_string()),
        }
    }

    fn error(source_id: impl Into<String>, err: &RagError) -> Self {
        Self {
            source_id: source_id.into(),
            status: ReindexStatus::Error,
            message: Some(err.to_string()),
        }
    }
}

/// Rebuilds the entire vector index from the metadata store's current
/// content, one document at a time.
///
/// Documents are processed sequentially; bounded load on the remote
/// embedding and vector services matters more here than throughput. A
/// parallel fan-out would be correct as long as remove-then-ingest
/// ordering is preserved per `source_id`, since ids are namespaced by
/// document.
pub struct ReindexOrchestrator {
    documents: Arc<dyn DocumentStore>,
    ingestion: IngestionService,
}

impl ReindexOrchestrator {
    pub fn new(documents: Arc<dyn DocumentStore>, ingestion: IngestionService) -> Self {
        Self {
            documents,
            ingestion,
        }
    }

    /// Reindexes every known document, collecting one outcome per item.
    ///
    /// Removal runs before the text check, so a document whose text became
    /// empty ends the run with zero vectors, so there is no
    /// removal-without-reingestion gap. Per-document failures are recorded
    /// and never abort the rest of the batch; only a failure to list the
    /// documents at all propagates.
    pub async fn reindex_all(&self) -> Result<Vec<ReindexOutcome>, RagError> {
        let documents = self.documents.list_documents().await?;
        info!(count = documents.len(), "starting full reindex");

        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            outcomes.push(self.reindex_document(&document).await);
        }

        let errors = outcomes
            .iter()
            .filter(|o| o.status == ReindexStatus::Error)
            .count();
        info!(
            total = outcomes.len(),
            errors, "full reindex finished"
        );
        Ok(outcomes)
    }

    /// Reindexes a single document by id, fetching its current text from
    /// the metadata store. The remove-then-ingest replace sequence the
    /// document-update path needs, packaged with outcome reporting.
    pub async fn reindex_one(&self, source_id: &str) -> Result<ReindexOutcome, RagError> {
        let text = self.documents.get_text(source_id).await?;
        let document = DocumentRecord {
            source_id: source_id.to_string(),
            display_name: source_id.to_string(),
            text,
        };
        Ok(self.reindex_document(&document).await)
    }

    async fn reindex_document(&self, document: &DocumentRecord) -> ReindexOutcome {
        let source_id = &document.source_id;
        self.ingestion.remove(source_id).await;

        let text = match document.text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => {
                info!(source_id, "reindex skipped: no text content");
                return ReindexOutcome::skipped(source_id);
            }
        };

        match self.ingestion.ingest(source_id, text).await {
            Ok(chunks) => ReindexOutcome::ok(source_id, chunks),
            Err(err) => {
                warn!(source_id, error = %err, "reindex failed for document");
                ReindexOutcome::error(source_id, &err)
            }
        }
    }
}

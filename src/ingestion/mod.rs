//! Document ingestion: chunk → embed → upsert, plus batch reindexing.

pub mod reindex;
pub mod service;

pub use reindex::{DocumentRecord, DocumentStore, ReindexOrchestrator, ReindexOutcome, ReindexStatus};
pub use service::{DEFAULT_FILENAME, IngestionService};

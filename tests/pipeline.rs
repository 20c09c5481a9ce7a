//! End-to-end pipeline tests over deterministic in-process doubles.
//!
//! Every remote collaborator is substituted: hash-based embeddings, an
//! in-memory vector index, a recording completion client, and a fixed
//! document list standing in for the metadata store.

use std::sync::Arc;

use async_trait::async_trait;
use ragcounsel::answer::{AnswerComposer, SYSTEM_PROMPT};
use ragcounsel::completion::MockCompletionClient;
use ragcounsel::embeddings::MockEmbeddingClient;
use ragcounsel::ingestion::{
    DocumentRecord, DocumentStore, IngestionService, ReindexOrchestrator, ReindexStatus,
};
use ragcounsel::retrieval::RetrievalService;
use ragcounsel::stores::InMemoryVectorIndex;
use ragcounsel::types::RagError;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter("info")
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

struct StaticDocumentStore {
    documents: Vec<DocumentRecord>,
}

#[async_trait]
impl DocumentStore for StaticDocumentStore {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RagError> {
        Ok(self.documents.clone())
    }

    async fn get_text(&self, source_id: &str) -> Result<Option<String>, RagError> {
        Ok(self
            .documents
            .iter()
            .find(|doc| doc.source_id == source_id)
            .and_then(|doc| doc.text.clone()))
    }
}

fn doc(source_id: &str, text: Option<&str>) -> DocumentRecord {
    DocumentRecord {
        source_id: source_id.to_string(),
        display_name: format!("{source_id}.txt"),
        text: text.map(str::to_string),
    }
}

fn ingestion(index: Arc<InMemoryVectorIndex>) -> IngestionService {
    IngestionService::new(Arc::new(MockEmbeddingClient::new()), index)
}

#[tokio::test]
async fn reingesting_identical_text_is_idempotent() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let service = ingestion(index.clone()).with_chunk_size(10);
    let text = "Tenancy deposits are customarily two months of rent.";

    service.ingest("doc1", text).await.unwrap();
    let ids_after_first = index.ids();
    let first_chunk = index.get("doc1_chunk_0").unwrap();

    service.ingest("doc1", text).await.unwrap();
    assert_eq!(index.ids(), ids_after_first);
    let rewritten = index.get("doc1_chunk_0").unwrap();
    assert_eq!(rewritten.embedding, first_chunk.embedding);
    assert_eq!(rewritten.metadata, first_chunk.metadata);
}

#[tokio::test]
async fn replace_with_fewer_chunks_leaves_no_orphans() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let service = ingestion(index.clone()).with_chunk_size(10);

    // 22 characters → 3 chunks.
    service.ingest("doc1", "aaaaaaaaaabbbbbbbbbbcc").await.unwrap();
    assert_eq!(
        index.ids(),
        vec!["doc1_chunk_0", "doc1_chunk_1", "doc1_chunk_2"]
    );

    // The caller-visible replace sequence: remove, then ingest.
    service.remove("doc1").await;
    service.ingest("doc1", "short").await.unwrap();
    assert_eq!(index.ids(), vec!["doc1_chunk_0"]);
}

#[tokio::test]
async fn removal_is_scoped_to_one_source() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let service = ingestion(index.clone());

    service.ingest("doc1", "first document body").await.unwrap();
    service.ingest("doc2", "second document body").await.unwrap();

    service.remove("doc1").await;
    assert_eq!(index.ids(), vec!["doc2_chunk_0"]);
}

#[tokio::test]
async fn empty_text_ingestion_creates_nothing_and_clears_nothing() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let service = ingestion(index.clone());

    service.ingest("doc1", "existing content").await.unwrap();
    let written = service.ingest("doc1", "").await.unwrap();
    assert_eq!(written, 0);
    // The earlier vectors survive: ingest only adds or replaces.
    assert_eq!(index.ids(), vec!["doc1_chunk_0"]);
}

#[tokio::test]
async fn retrieval_returns_at_most_top_k_in_relevance_order() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let embeddings = Arc::new(MockEmbeddingClient::new());
    let service = IngestionService::new(embeddings.clone(), index.clone());

    let sentences = [
        "Stamp duty is payable on every tenancy agreement.",
        "Eviction requires a court order in most cases.",
        "Deposits must be refunded within a reasonable period.",
        "Subletting requires the landlord's written consent.",
    ];
    for (i, sentence) in sentences.iter().enumerate() {
        service.ingest(&format!("doc{i}"), sentence).await.unwrap();
    }

    let retrieval = RetrievalService::new(embeddings, index);
    // Asking with one indexed sentence verbatim makes its vector identical
    // to the query vector, so it must rank first.
    let context = retrieval
        .retrieve_top("Eviction requires a court order in most cases.", 3)
        .await
        .unwrap();

    let lines: Vec<&str> = context.lines().collect();
    assert!(lines.len() <= 3);
    assert_eq!(lines[0], "Eviction requires a court order in most cases.");
}

#[tokio::test]
async fn batch_reindex_isolates_per_document_failures() {
    init_tracing();
    let index = Arc::new(InMemoryVectorIndex::new());
    let embeddings = Arc::new(MockEmbeddingClient::new().with_failure_marker("POISON"));
    let ingestion = IngestionService::new(embeddings, index.clone());

    let store = StaticDocumentStore {
        documents: vec![
            doc("doc1", Some("first document text")),
            doc("doc2", Some("POISON makes this one fail")),
            doc("doc3", Some("third document text")),
        ],
    };
    let orchestrator = ReindexOrchestrator::new(Arc::new(store), ingestion);

    let outcomes = orchestrator.reindex_all().await.unwrap();
    let statuses: Vec<ReindexStatus> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![ReindexStatus::Ok, ReindexStatus::Error, ReindexStatus::Ok]
    );
    assert!(
        outcomes[1]
            .message
            .as_deref()
            .unwrap()
            .contains("chunk 0")
    );

    // Documents 1 and 3 were indexed despite document 2's failure.
    assert_eq!(index.ids(), vec!["doc1_chunk_0", "doc3_chunk_0"]);
}

#[tokio::test]
async fn reindex_mixes_ok_and_skipped_outcomes() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let ingestion = ingestion(index.clone());

    let store = StaticDocumentStore {
        documents: vec![
            doc("textual", Some("has extractable text")),
            doc("scanned-pdf", None),
        ],
    };
    let outcomes = ReindexOrchestrator::new(Arc::new(store), ingestion)
        .reindex_all()
        .await
        .unwrap();

    assert_eq!(outcomes[0].status, ReindexStatus::Ok);
    assert_eq!(outcomes[1].status, ReindexStatus::Skipped);
    assert_eq!(outcomes[1].message.as_deref(), Some("no text content"));
    assert_eq!(index.ids(), vec!["textual_chunk_0"]);
}

#[tokio::test]
async fn question_with_no_matches_still_gets_an_answer() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let retrieval =
        RetrievalService::new(Arc::new(MockEmbeddingClient::new()), index);
    let completions = MockCompletionClient::new("ungrounded answer");
    let composer = AnswerComposer::new(Arc::new(completions.clone()));

    let context = retrieval.retrieve("anything at all").await.unwrap();
    assert_eq!(context, "");

    let answer = composer.compose("anything at all", &context).await.unwrap();
    assert_eq!(answer, "ungrounded answer");
    assert_eq!(
        completions.calls()[0].user,
        "Context:\n\n\nQuestion: anything at all"
    );
}

#[tokio::test]
async fn end_to_end_question_is_grounded_in_the_stored_chunk() {
    init_tracing();
    let index = Arc::new(InMemoryVectorIndex::new());
    let embeddings = Arc::new(MockEmbeddingClient::new());

    // 36 characters at chunk size 500 → exactly one vector.
    let sentence = "Eviction requires 24 hours notice.";
    let service = IngestionService::new(embeddings.clone(), index.clone());
    let written = service.ingest("tenancy-law", sentence).await.unwrap();
    assert_eq!(written, 1);
    assert_eq!(index.ids(), vec!["tenancy-law_chunk_0"]);

    let retrieval = RetrievalService::new(embeddings, index);
    let question = "What notice is required for eviction?";
    let context = retrieval.retrieve(question).await.unwrap();
    assert_eq!(context, sentence);

    let completions = MockCompletionClient::new("24 hours notice is required.");
    let composer = AnswerComposer::new(Arc::new(completions.clone()));
    let answer = composer.compose(question, &context).await.unwrap();
    assert_eq!(answer, "24 hours notice is required.");

    let calls = completions.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, SYSTEM_PROMPT);
    assert!(calls[0].user.contains(sentence));
    assert!(calls[0].user.contains(question));
}

#[tokio::test]
async fn failed_ingestion_converges_on_full_retry() {
    let index = Arc::new(InMemoryVectorIndex::new());
    let failing = Arc::new(MockEmbeddingClient::new().with_failure_marker("POISON"));
    let service = IngestionService::new(failing, index.clone()).with_chunk_size(10);

    // Chunk 1 fails; chunk 0 is already written.
    let err = service
        .ingest("doc1", "good text.POISON....tail")
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Ingestion { chunk_index: 1, .. }));
    assert_eq!(index.ids(), vec!["doc1_chunk_0"]);

    // The service outage clears; retrying the whole call overwrites chunk 0
    // in place and completes the document.
    let healthy = IngestionService::new(Arc::new(MockEmbeddingClient::new()), index.clone())
        .with_chunk_size(10);
    let written = healthy
        .ingest("doc1", "good text.POISON....tail")
        .await
        .unwrap();
    assert_eq!(written, 3);
    assert_eq!(
        index.ids(),
        vec!["doc1_chunk_0", "doc1_chunk_1", "doc1_chunk_2"]
    );
}

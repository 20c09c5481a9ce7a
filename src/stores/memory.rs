//! In-memory vector index.
//!
//! Ships in the crate proper (not behind `cfg(test)`) for the same reason
//! the mock embedding client does: deterministic pipeline tests and small
//! single-process deployments both need an index with zero external
//! dependencies. Ranking uses cosine similarity, matching what the remote
//! and sqlite backends report.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{QueryMatch, VectorIndex, VectorRecord};
use crate::types::RagError;

#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    records: Mutex<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// All stored vector ids, sorted. Intended for assertions in tests.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Fetches a stored record by id.
    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records.lock().get(id).cloned()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, record: VectorRecord) -> Result<(), RagError> {
        self.records.lock().insert(record.id.clone(), record);
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<QueryMatch>, RagError> {
        let mut matches: Vec<QueryMatch> = self
            .records
            .lock()
            .values()
            .map(|record| QueryMatch {
                text: record.metadata.text.clone(),
                source_id: record.metadata.source_id.clone(),
                score: cosine_similarity(embedding, &record.embedding),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<(), RagError> {
        self.records
            .lock()
            .retain(|_, record| record.metadata.source_id != source_id);
        Ok(())
    }
}

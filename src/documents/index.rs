//! In-process vector index.
//!
//! Keeps chunk vectors in memory and ranks them by cosine similarity. Pairs
//! with `HashingEmbedder` to run retrieval with no hosted vector store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use super::embeddings::find_similar;
use crate::services::{SearchFilter, ServiceError, VectorIndex, VectorMatch, VectorRecord};

#[derive(Default)]
pub struct InMemoryIndex {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), ServiceError> {
        let count = records.len();
        let mut store = self.records.write();
        for record in records {
            store.insert(record.id.clone(), record);
        }
        debug!(count = count, total = store.len(), "Upserted vectors");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: &SearchFilter,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, ServiceError> {
        let store = self.records.read();

        let candidates = store
            .values()
            .filter(|r| filter.matches(&r.metadata))
            .map(|r| (r.id.as_str(), r.values.as_slice()));

        let matches = find_similar(vector, candidates, top_k)
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .filter_map(|(id, score)| {
                store.get(id).map(|r| VectorMatch {
                    id: r.id.clone(),
                    score,
                    metadata: r.metadata.clone(),
                })
            })
            .collect();

        Ok(matches)
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), ServiceError> {
        let mut store = self.records.write();
        let before = store.len();
        store.retain(|_, r| r.metadata.document_id != document_id);
        debug!(document_id = %document_id, removed = before - store.len(), "Deleted document vectors");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::VectorMetadata;

    fn record(doc: &str, idx: u32, values: Vec<f32>) -> VectorRecord {
        let id = format!("{doc}_{idx}");
        VectorRecord {
            metadata: VectorMetadata::new(&id, doc, &format!("{doc}.txt"), "chunk text"),
            id,
            values,
        }
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let index = InMemoryIndex::new();
        index
            .upsert(vec![
                record("a", 0, vec![1.0, 0.0]),
                record("a", 1, vec![0.6, 0.8]),
                record("b", 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], &SearchFilter::default(), 5).await.unwrap();

        // Orthogonal vector scores 0 and is dropped
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a_0");
        assert_eq!(hits[1].id, "a_1");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_query_respects_filter_and_top_k() {
        let index = InMemoryIndex::new();
        index
            .upsert(vec![
                record("a", 0, vec![1.0, 0.1]),
                record("b", 0, vec![1.0, 0.0]),
                record("b", 1, vec![1.0, 0.2]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], &SearchFilter::document("b"), 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b_0");
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_delete_document() {
        let index = InMemoryIndex::new();
        index.upsert(vec![record("a", 0, vec![1.0, 0.0])]).await.unwrap();
        index.upsert(vec![record("a", 0, vec![0.0, 1.0]), record("b", 0, vec![1.0, 0.0])]).await.unwrap();
        assert_eq!(index.len(), 2);

        index.delete_document("a").await.unwrap();
        assert_eq!(index.len(), 1);
        let hits = index.query(&[1.0, 0.0], &SearchFilter::default(), 5).await.unwrap();
        assert_eq!(hits[0].metadata.document_id, "b");
    }
}

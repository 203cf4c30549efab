use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::{
    ports::{Collection, VectorIndex},
    CollectionSpec, Embedding, IndexError, IndexRecord, QueryMatch,
};

/// Process-local vector index with the same contract as the Qdrant adapter.
pub struct InMemoryVectorIndex {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections
            .read()
            .map(|c| c.contains_key(name))
            .unwrap_or(false)
    }

    /// Snapshot of a collection's records ordered by id.
    pub fn records(&self, name: &str) -> Option<Vec<IndexRecord>> {
        let collections = self.collections.read().ok()?;
        let collection = collections.get(name)?;
        let mut records = collection.records.read().ok()?.clone();
        records.sort_by_key(|r| r.id);
        Some(records)
    }

    pub fn record_count(&self, name: &str) -> Option<usize> {
        self.records(name).map(|r| r.len())
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn delete_collection(&self, name: &str) -> Result<(), IndexError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| IndexError::service(e.to_string()))?;

        collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| IndexError::CollectionNotFound(name.to_string()))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), IndexError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| IndexError::service(e.to_string()))?;

        if collections.contains_key(&spec.name) {
            return Err(IndexError::service(format!(
                "collection {} already exists",
                spec.name
            )));
        }
        collections.insert(spec.name.clone(), InMemoryCollection::new(spec.clone()));
        Ok(())
    }

    async fn get_collection(&self, name: &str) -> Result<Box<dyn Collection>, IndexError> {
        let collections = self
            .collections
            .read()
            .map_err(|e| IndexError::service(e.to_string()))?;

        collections
            .get(name)
            .map(|c| Box::new(c.clone()) as Box<dyn Collection>)
            .ok_or_else(|| IndexError::CollectionNotFound(name.to_string()))
    }
}

#[derive(Clone)]
pub struct InMemoryCollection {
    spec: CollectionSpec,
    records: Arc<RwLock<Vec<IndexRecord>>>,
}

impl InMemoryCollection {
    fn new(spec: CollectionSpec) -> Self {
        Self {
            spec,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Collection for InMemoryCollection {
    fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError> {
        for record in records {
            record.vector.ensure_dimension(self.spec.dimension)?;
        }

        let mut store = self
            .records
            .write()
            .map_err(|e| IndexError::service(e.to_string()))?;

        for record in records {
            store.retain(|r| r.id != record.id);
            store.push(record.clone());
        }
        Ok(())
    }

    async fn query(&self, vector: &Embedding, top_k: usize) -> Result<Vec<QueryMatch>, IndexError> {
        vector.ensure_dimension(self.spec.dimension)?;

        let store = self
            .records
            .read()
            .map_err(|e| IndexError::service(e.to_string()))?;

        let mut matches: Vec<QueryMatch> = store
            .iter()
            .map(|record| QueryMatch {
                id: record.id,
                score: vector.cosine_similarity(&record.vector),
                metadata: record.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        matches.truncate(top_k);

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RecordId, RecordMetadata};

    fn record(id: u64, vector: Vec<f32>, text: &str) -> IndexRecord {
        IndexRecord {
            id: RecordId(id),
            vector: Embedding::new(vector),
            metadata: RecordMetadata {
                text: text.to_string(),
                source: "test.pdf".to_string(),
                page: Some(1),
                chunk_index: 0,
            },
        }
    }

    async fn index_with_collection() -> InMemoryVectorIndex {
        let index = InMemoryVectorIndex::new();
        index
            .create_collection(&CollectionSpec::cosine("docs", 3))
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_upsert_and_query_ranks_by_cosine() {
        let index = index_with_collection().await;
        let collection = index.get_collection("docs").await.unwrap();

        collection
            .upsert(&[
                record(0, vec![0.0, 1.0, 0.0], "orthogonal"),
                record(1, vec![1.0, 0.1, 0.0], "close"),
                record(2, vec![5.0, 0.0, 0.0], "exact"),
                record(3, vec![-1.0, 0.0, 0.0], "opposite"),
            ])
            .await
            .unwrap();

        let matches = collection
            .query(&Embedding::new(vec![1.0, 0.0, 0.0]), 3)
            .await
            .unwrap();

        let texts: Vec<&str> = matches.iter().map(|m| m.metadata.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "close", "orthogonal"]);
        assert!((matches[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let index = index_with_collection().await;
        let collection = index.get_collection("docs").await.unwrap();

        collection
            .upsert(&[record(0, vec![1.0, 0.0, 0.0], "old")])
            .await
            .unwrap();
        collection
            .upsert(&[record(0, vec![1.0, 0.0, 0.0], "new")])
            .await
            .unwrap();

        let records = index.records("docs").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata.text, "new");
    }

    #[tokio::test]
    async fn test_rejects_wrong_dimension() {
        let index = index_with_collection().await;
        let collection = index.get_collection("docs").await.unwrap();

        let err = collection
            .upsert(&[record(0, vec![1.0, 0.0], "short")])
            .await
            .unwrap_err();
        assert!(err.is_dimension_mismatch());
        assert_eq!(index.record_count("docs"), Some(0));

        let err = collection
            .query(&Embedding::new(vec![1.0; 4]), 1)
            .await
            .unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[tokio::test]
    async fn test_delete_missing_collection_is_not_found() {
        let index = InMemoryVectorIndex::new();
        let err = index.delete_collection("docs").await.unwrap_err();
        assert!(err.is_not_found());

        let err = index.get_collection("docs").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_drops_records() {
        let index = index_with_collection().await;
        let collection = index.get_collection("docs").await.unwrap();
        collection
            .upsert(&[record(0, vec![1.0, 0.0, 0.0], "a")])
            .await
            .unwrap();

        index.delete_collection("docs").await.unwrap();
        assert!(!index.contains("docs"));

        index
            .create_collection(&CollectionSpec::cosine("docs", 3))
            .await
            .unwrap();
        assert_eq!(index.record_count("docs"), Some(0));
    }
}

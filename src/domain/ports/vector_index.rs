use async_trait::async_trait;

use crate::domain::{errors::IndexError, CollectionSpec, Embedding, IndexRecord, QueryMatch};

/// Connection to a vector index service holding named collections.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Fails with [`IndexError::CollectionNotFound`] when nothing is stored under `name`.
    async fn delete_collection(&self, name: &str) -> Result<(), IndexError>;
    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), IndexError>;
    async fn get_collection(&self, name: &str) -> Result<Box<dyn Collection>, IndexError>;
}

/// Handle to one existing collection.
#[async_trait]
pub trait Collection: Send + Sync {
    fn spec(&self) -> &CollectionSpec;

    /// Vectors whose length differs from the collection dimension are rejected.
    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError>;

    /// Top `top_k` records ranked by similarity, best first.
    async fn query(&self, vector: &Embedding, top_k: usize) -> Result<Vec<QueryMatch>, IndexError>;
}

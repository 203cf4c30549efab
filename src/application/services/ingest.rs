use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    ports::{Collection, DocumentLoader, EmbeddingService, VectorIndex},
    Chunk, CollectionSpec, DomainError, IndexRecord, TextSplitter,
};

/// What ingestion does when an embedding or upsert batch fails.
///
/// Fatal errors (configuration, dimension mismatch) are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Abort,
    Retry { max_attempts: u32, backoff_ms: u64 },
}

impl FailurePolicy {
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::Abort => 1,
            Self::Retry { max_attempts, .. } => *max_attempts,
        }
    }

    pub fn backoff(&self) -> Duration {
        match self {
            Self::Abort => Duration::ZERO,
            Self::Retry { backoff_ms, .. } => Duration::from_millis(*backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks: usize,
    pub records_written: usize,
}

pub struct IngestService {
    embedding: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
    collection: CollectionSpec,
    splitter: TextSplitter,
    batch_size: usize,
    policy: FailurePolicy,
}

impl IngestService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
        collection: CollectionSpec,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            embedding,
            index,
            collection,
            splitter,
            batch_size: 100,
            policy: FailurePolicy::Abort,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Rebuilds the collection from whatever `loader` yields.
    ///
    /// Chunks are embedded before the old collection is dropped, so a failing
    /// embedding provider leaves the previous index untouched. A failure while
    /// upserting leaves a partial collection; re-running is safe.
    #[instrument(skip_all, fields(collection = %self.collection.name))]
    pub async fn run(&self, loader: &dyn DocumentLoader) -> Result<IngestReport, DomainError> {
        if self.embedding.dimension() != self.collection.dimension {
            return Err(DomainError::config(format!(
                "embedding dimension {} does not match collection dimension {}",
                self.embedding.dimension(),
                self.collection.dimension
            )));
        }

        let documents = loader.load()?;
        info!(pages = documents.len(), "documents loaded");

        let mut chunks = self.splitter.split_all(&documents);
        let produced = chunks.len();
        chunks.retain(|c| !c.text.trim().is_empty());
        if chunks.len() < produced {
            debug!(skipped = produced - chunks.len(), "whitespace-only chunks skipped");
        }
        info!(
            chunks = chunks.len(),
            chunk_size = self.splitter.chunk_size(),
            overlap = self.splitter.chunk_overlap(),
            "documents split"
        );

        let records = self.embed_chunks(&chunks).await?;

        self.rebuild_collection().await?;
        let collection = self.index.get_collection(&self.collection.name).await?;
        let records_written = self.upsert_records(collection.as_ref(), &records).await?;

        let report = IngestReport {
            pages: documents.len(),
            chunks: chunks.len(),
            records_written,
        };
        info!(
            pages = report.pages,
            chunks = report.chunks,
            records = report.records_written,
            "ingestion complete"
        );
        Ok(report)
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<IndexRecord>, DomainError> {
        let mut records = Vec::with_capacity(chunks.len());
        let embedding = &self.embedding;

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let texts = texts.as_slice();
            let vectors = self
                .with_policy("embed", move || embedding.embed_batch(texts))
                .await?;

            if vectors.len() != batch.len() {
                return Err(DomainError::embedding(format!(
                    "requested {} embeddings, received {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                let ordinal = records.len() as u64;
                records.push(IndexRecord::from_chunk(ordinal, chunk, vector));
            }
            debug!(embedded = records.len(), total = chunks.len(), "embedding progress");
        }

        Ok(records)
    }

    async fn rebuild_collection(&self) -> Result<(), DomainError> {
        let name = &self.collection.name;
        match self.index.delete_collection(name).await {
            Ok(()) => info!("dropped existing collection"),
            Err(e) if e.is_not_found() => debug!("no existing collection to drop"),
            Err(e) => return Err(e.into()),
        }

        self.index.create_collection(&self.collection).await?;
        info!(
            dimension = self.collection.dimension,
            distance = ?self.collection.distance,
            precision = ?self.collection.precision,
            "collection created"
        );
        Ok(())
    }

    async fn upsert_records(
        &self,
        collection: &dyn Collection,
        records: &[IndexRecord],
    ) -> Result<usize, DomainError> {
        let mut written = 0;

        for batch in records.chunks(self.batch_size) {
            self.with_policy("upsert", move || async move {
                collection.upsert(batch).await.map_err(DomainError::from)
            })
            .await?;

            written += batch.len();
            info!("{}/{} records written", written, records.len());
        }

        Ok(written)
    }

    async fn with_policy<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let max_attempts = self.policy.max_attempts().max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_fatal() || attempt >= max_attempts => return Err(e),
                Err(e) => {
                    warn!(operation, attempt, max_attempts, error = %e, "batch failed, retrying");
                    tokio::time::sleep(self.policy.backoff()).await;
                    attempt += 1;
                }
            }
        }
    }
}

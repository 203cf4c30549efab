use async_trait::async_trait;
use qdrant_client::qdrant::{
    vectors_config, CreateCollectionBuilder, Datatype, Distance as QdrantDistance, PointStruct,
    ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder, VectorsConfig,
};
use qdrant_client::{Payload, Qdrant};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{
    ports::{Collection, VectorIndex},
    CollectionSpec, Distance, Embedding, IndexError, IndexRecord, Precision, QueryMatch, RecordId,
    RecordMetadata,
};

pub struct QdrantVectorIndex {
    client: Arc<Qdrant>,
}

impl QdrantVectorIndex {
    pub fn connect(url: &str) -> Result<Self, IndexError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| IndexError::service(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    async fn ensure_exists(&self, name: &str) -> Result<(), IndexError> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| IndexError::service(e.to_string()))?;

        if exists {
            Ok(())
        } else {
            Err(IndexError::CollectionNotFound(name.to_string()))
        }
    }

    /// Reads the single unnamed vector configuration back from the server.
    async fn fetch_spec(&self, name: &str) -> Result<CollectionSpec, IndexError> {
        let info = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| IndexError::service(e.to_string()))?;

        let vectors = info
            .result
            .and_then(|i| i.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config);

        spec_from_vectors_config(name, vectors)
    }
}

fn qdrant_distance(distance: Distance) -> QdrantDistance {
    match distance {
        Distance::Cosine => QdrantDistance::Cosine,
    }
}

fn qdrant_datatype(precision: Precision) -> Datatype {
    match precision {
        Precision::Float32 => Datatype::Float32,
    }
}

/// Reads a collection's single unnamed vector configuration.
fn spec_from_vectors_config(
    name: &str,
    vectors: Option<VectorsConfig>,
) -> Result<CollectionSpec, IndexError> {
    let params = vectors
        .and_then(|v| v.config)
        .and_then(|c| match c {
            vectors_config::Config::Params(params) => Some(params),
            vectors_config::Config::ParamsMap(_) => None,
        })
        .ok_or_else(|| {
            IndexError::service(format!(
                "collection {name} has no single unnamed vector configuration"
            ))
        })?;

    if params.distance != QdrantDistance::Cosine as i32 {
        return Err(IndexError::service(format!(
            "collection {name} is not configured for cosine similarity"
        )));
    }

    Ok(CollectionSpec::cosine(name, params.size as usize))
}

/// Point id is the record ordinal; `chunk_{n}` travels in the payload.
fn point_from_record(dimension: usize, record: &IndexRecord) -> Result<PointStruct, IndexError> {
    record.vector.ensure_dimension(dimension)?;

    let payload: Payload = serde_json::json!({
        "id": record.id.to_string(),
        "ordinal": record.id.as_u64(),
        "text": record.metadata.text,
        "source": record.metadata.source,
        "page": record.metadata.page,
        "chunk_index": record.metadata.chunk_index,
    })
    .try_into()
    .map_err(|_| IndexError::service("Failed to create payload"))?;

    Ok(PointStruct::new(
        record.id.as_u64(),
        record.vector.as_slice().to_vec(),
        payload,
    ))
}

/// `None` when the payload lacks the ordinal or the text.
fn match_from_point(point: ScoredPoint) -> Option<QueryMatch> {
    let payload = point.payload;

    let ordinal = payload.get("ordinal")?.as_integer()?;
    let text = payload.get("text")?.as_str()?.to_string();
    let source = payload
        .get("source")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default();
    let page = payload
        .get("page")
        .and_then(|v| v.as_integer())
        .map(|p| p as u32);
    let chunk_index = payload
        .get("chunk_index")
        .and_then(|v| v.as_integer())
        .unwrap_or_default() as usize;

    Some(QueryMatch {
        id: RecordId(ordinal as u64),
        score: point.score,
        metadata: RecordMetadata {
            text,
            source,
            page,
            chunk_index,
        },
    })
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    async fn delete_collection(&self, name: &str) -> Result<(), IndexError> {
        self.ensure_exists(name).await?;

        self.client
            .delete_collection(name)
            .await
            .map_err(|e| IndexError::service(e.to_string()))?;

        debug!(collection = name, "collection deleted");
        Ok(())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), IndexError> {
        let vectors = VectorParamsBuilder::new(spec.dimension as u64, qdrant_distance(spec.distance))
            .datatype(qdrant_datatype(spec.precision));

        self.client
            .create_collection(CreateCollectionBuilder::new(&spec.name).vectors_config(vectors))
            .await
            .map_err(|e| IndexError::service(e.to_string()))?;

        Ok(())
    }

    async fn get_collection(&self, name: &str) -> Result<Box<dyn Collection>, IndexError> {
        self.ensure_exists(name).await?;
        let spec = self.fetch_spec(name).await?;

        Ok(Box::new(QdrantCollection {
            client: self.client.clone(),
            spec,
        }))
    }
}

pub struct QdrantCollection {
    client: Arc<Qdrant>,
    spec: CollectionSpec,
}

#[async_trait]
impl Collection for QdrantCollection {
    fn spec(&self) -> &CollectionSpec {
        &self.spec
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|r| point_from_record(self.spec.dimension, r))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.spec.name, points).wait(true))
            .await
            .map_err(|e| IndexError::service(e.to_string()))?;

        Ok(())
    }

    async fn query(&self, vector: &Embedding, top_k: usize) -> Result<Vec<QueryMatch>, IndexError> {
        vector.ensure_dimension(self.spec.dimension)?;

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.spec.name, vector.as_slice().to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| IndexError::service(e.to_string()))?;

        let returned = results.result.len();
        let matches = results
            .result
            .into_iter()
            .filter_map(match_from_point)
            .collect::<Vec<_>>();

        if matches.len() < returned {
            warn!(
                collection = %self.spec.name,
                skipped = returned - matches.len(),
                "points without a usable payload were skipped"
            );
        }

        Ok(matches)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Chunk, Embedding};

/// Stable ordinal of a chunk within one ingestion run, rendered as `chunk_{n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
    pub chunk_index: usize,
}

impl From<&Chunk> for RecordMetadata {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source: chunk.source.clone(),
            page: chunk.page,
            chunk_index: chunk.index,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: RecordId,
    pub vector: Embedding,
    pub metadata: RecordMetadata,
}

impl IndexRecord {
    pub fn from_chunk(ordinal: u64, chunk: &Chunk, vector: Embedding) -> Self {
        Self {
            id: RecordId(ordinal),
            vector,
            metadata: RecordMetadata::from(chunk),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Float32,
}

/// Configuration a collection is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
    pub precision: Precision,
}

impl CollectionSpec {
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance: Distance::Cosine,
            precision: Precision::Float32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: RecordId,
    pub score: f32,
    pub metadata: RecordMetadata,
}

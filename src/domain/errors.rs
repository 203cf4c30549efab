use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Load error: {0}")]
    Load(String),

    #[error("Split error: {0}")]
    Split(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomainError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn split(msg: impl Into<String>) -> Self {
        Self::Split(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Fatal errors end the process; the rest are recoverable per chat turn.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Load(_) | Self::Split(_) | Self::Io(_) => true,
            Self::Index(e) => e.is_dimension_mismatch(),
            Self::Embedding(_) | Self::Inference(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector index service error: {0}")]
    Service(String),
}

impl IndexError {
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CollectionNotFound(_))
    }

    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

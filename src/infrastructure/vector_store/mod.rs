mod in_memory;
mod qdrant;

pub use in_memory::{InMemoryCollection, InMemoryVectorIndex};
pub use qdrant::{QdrantCollection, QdrantVectorIndex};

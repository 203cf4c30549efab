mod document;
mod embedding;
mod message;
mod record;

pub use document::{Chunk, Document, TextSplitter};
pub use embedding::Embedding;
pub use message::{GenerationParams, Message, MessageRole};
pub use record::{
    CollectionSpec, Distance, IndexRecord, Precision, QueryMatch, RecordId, RecordMetadata,
};

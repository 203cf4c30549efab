pub mod config;
pub mod embedding;
pub mod input;
pub mod llm;
pub mod loader;
pub mod telemetry;
pub mod vector_store;

pub use config::Settings;
pub use embedding::HuggingFaceEmbedding;
pub use input::PromptedLines;
pub use llm::HuggingFaceChat;
pub use loader::PdfDirectoryLoader;
pub use vector_store::{InMemoryVectorIndex, QdrantVectorIndex};

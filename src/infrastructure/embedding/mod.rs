mod huggingface;

pub use huggingface::HuggingFaceEmbedding;

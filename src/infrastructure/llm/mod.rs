mod huggingface;

pub use huggingface::HuggingFaceChat;

use crate::domain::{errors::DomainError, GenerationParams, Message};
use async_trait::async_trait;

#[async_trait]
pub trait LlmService: Send + Sync {
    /// Returns the content of the first choice.
    async fn chat_completion(
        &self,
        messages: &[Message],
        params: GenerationParams,
    ) -> Result<String, DomainError>;
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{ports::LlmService, DomainError, GenerationParams, Message};
use crate::infrastructure::config::LlmConfig;

/// Chat completions through the Hugging Face router's OpenAI-compatible API.
pub struct HuggingFaceChat {
    http: reqwest::Client,
    base_url: String,
    model: String,
    token: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl HuggingFaceChat {
    pub fn new(config: &LlmConfig, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl LlmService for HuggingFaceChat {
    #[instrument(skip(self, messages), fields(model = %self.model))]
    async fn chat_completion(
        &self,
        messages: &[Message],
        params: GenerationParams,
    ) -> Result<String, DomainError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::inference(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DomainError::inference(format!(
                "chat completion returned {status}: {text}"
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DomainError::inference(format!("malformed completion: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DomainError::inference("completion contained no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client(server: &MockServer) -> HuggingFaceChat {
        let config = LlmConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        HuggingFaceChat::new(&config, "hf_test")
    }

    fn messages() -> Vec<Message> {
        vec![
            Message::system("Answer from context."),
            Message::user("Context:\nA\n\nQuestion: B"),
        ]
    }

    #[tokio::test]
    async fn test_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_partial_json(json!({
                "model": "HuggingFaceH4/zephyr-7b-beta",
                "max_tokens": 512,
                "temperature": 0.5,
                "messages": [
                    { "role": "system", "content": "Answer from context." },
                    { "role": "user", "content": "Context:\nA\n\nQuestion: B" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "I don't know" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client(&server)
            .chat_completion(&messages(), GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(answer, "I don't know");
    }

    #[tokio::test]
    async fn test_rate_limit_is_inference_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limit reached"))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat_completion(&messages(), GenerationParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Inference(_)));
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_missing_choices_is_inference_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat_completion(&messages(), GenerationParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Inference(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_inference_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .chat_completion(&messages(), GenerationParams::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed completion"));
    }
}

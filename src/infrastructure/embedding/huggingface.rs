use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// Sentence embeddings from the Hugging Face feature-extraction pipeline.
pub struct HuggingFaceEmbedding {
    http: reqwest::Client,
    base_url: String,
    model: String,
    token: Option<String>,
    dimension: usize,
}

impl HuggingFaceEmbedding {
    pub fn new(config: &EmbeddingConfig, dimension: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            token: None,
            dimension,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/hf-inference/models/{}/pipeline/feature-extraction",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl EmbeddingService for HuggingFaceEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::embedding("No embedding returned"))
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .http
            .post(self.endpoint())
            .json(&serde_json::json!({ "inputs": texts }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::embedding(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| DomainError::embedding(format!("malformed embedding response: {e}")))?;

        if vectors.len() != texts.len() {
            return Err(DomainError::embedding(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        debug!(received = vectors.len(), "embeddings received");

        vectors
            .into_iter()
            .map(|v| {
                let embedding = Embedding::new(v);
                embedding.ensure_dimension(self.dimension).map_err(|e| {
                    DomainError::config(format!("embedding model {}: {e}", self.model))
                })?;
                Ok(embedding)
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

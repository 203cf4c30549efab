use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::application::FailurePolicy;
use crate::domain::{CollectionSpec, DomainError, GenerationParams};

pub const CONFIG_PATH_ENV: &str = "MEDBOT_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub auth: AuthConfig,
    pub collection: CollectionConfig,
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub chunking: ChunkingConfig,
    pub ingest: IngestConfig,
    pub rag: RagConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding the inference API token.
    pub token_env: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub name: String,
    pub dimension: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub top_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub system: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            auth: AuthConfig::default(),
            collection: CollectionConfig::default(),
            qdrant: QdrantConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            chunking: ChunkingConfig::default(),
            ingest: IngestConfig::default(),
            rag: RagConfig::default(),
            prompts: PromptsConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: "HF_TOKEN".to_string(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: "medical_chatbot".to_string(),
            dimension: 384,
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.huggingface.co".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            base_url: "https://router.huggingface.co".to_string(),
            model: "HuggingFaceH4/zephyr-7b-beta".to_string(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 500,
            overlap: 50,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            on_failure: FailurePolicy::Abort,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system: "You are a helpful medical assistant. Answer only based on the given \
                     context. If you don't know, say 'I don't know'."
                .to_string(),
        }
    }
}

impl Settings {
    /// Reads the YAML file named by `MEDBOT_CONFIG` (or `config.yaml` when
    /// present), then applies environment overrides and validates.
    pub fn load() -> Result<Self, DomainError> {
        let mut settings = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, DomainError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&raw)
            .map_err(|e| DomainError::config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn from_yaml(raw: &str) -> Result<Self, DomainError> {
        serde_yaml::from_str(raw).map_err(|e| DomainError::config(format!("invalid config: {e}")))
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("QDRANT_URL") {
            self.qdrant.url = url;
        }
        if let Some(dir) = var("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(base) = var("HF_BASE_URL") {
            self.embedding.base_url = base.clone();
            self.llm.base_url = base;
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.collection.name.trim().is_empty() {
            return Err(DomainError::config("collection name must not be empty"));
        }
        if self.collection.dimension == 0 {
            return Err(DomainError::config("collection dimension must be greater than zero"));
        }
        if self.chunking.size == 0 {
            return Err(DomainError::config("chunk size must be greater than zero"));
        }
        if self.chunking.overlap >= self.chunking.size {
            return Err(DomainError::config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.overlap, self.chunking.size
            )));
        }
        if self.ingest.batch_size == 0 {
            return Err(DomainError::config("batch size must be greater than zero"));
        }
        if self.ingest.on_failure.max_attempts() == 0 {
            return Err(DomainError::config("retry policy needs at least one attempt"));
        }
        if self.rag.top_k == 0 {
            return Err(DomainError::config("top_k must be greater than zero"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DomainError::config(format!(
                "temperature {} is outside [0, 2]",
                self.llm.temperature
            )));
        }
        Ok(())
    }

    /// Token from the configured environment variable; blank counts as missing.
    pub fn token(&self, var: impl Fn(&str) -> Option<String>) -> Option<String> {
        var(&self.auth.token_env).filter(|t| !t.trim().is_empty())
    }

    pub fn require_token(&self, var: impl Fn(&str) -> Option<String>) -> Result<String, DomainError> {
        self.token(var).ok_or_else(|| {
            DomainError::config(format!(
                "{} is not set; an inference API token is required",
                self.auth.token_env
            ))
        })
    }

    pub fn collection_spec(&self) -> CollectionSpec {
        CollectionSpec::cosine(&self.collection.name, self.collection.dimension)
    }

    pub fn generation(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.collection.name, "medical_chatbot");
        assert_eq!(settings.collection.dimension, 384);
        assert_eq!(settings.chunking.size, 500);
        assert_eq!(settings.chunking.overlap, 50);
        assert_eq!(settings.ingest.batch_size, 100);
        assert_eq!(settings.ingest.on_failure, FailurePolicy::Abort);
        assert_eq!(settings.rag.top_k, 3);
        assert_eq!(settings.generation(), GenerationParams { max_tokens: 512, temperature: 0.5 });
        assert!(settings.prompts.system.contains("I don't know"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml(
            r#"
data_dir: /srv/pdfs
rag:
  top_k: 5
ingest:
  on_failure:
    mode: retry
    max_attempts: 3
    backoff_ms: 250
"#,
        )
        .unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("/srv/pdfs"));
        assert_eq!(settings.rag.top_k, 5);
        assert_eq!(settings.ingest.batch_size, 100);
        assert_eq!(
            settings.ingest.on_failure,
            FailurePolicy::Retry {
                max_attempts: 3,
                backoff_ms: 250
            }
        );
        assert_eq!(settings.collection.name, "medical_chatbot");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "collection:\n  name: cardiology\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.collection.name, "cardiology");
        assert_eq!(settings.collection.dimension, 384);

        let missing = Settings::from_file(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(DomainError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[
            ("QDRANT_URL", "http://qdrant:6334"),
            ("DATA_DIR", "/data"),
            ("HF_BASE_URL", "http://localhost:8080"),
        ]));

        assert_eq!(settings.qdrant.url, "http://qdrant:6334");
        assert_eq!(settings.data_dir, PathBuf::from("/data"));
        assert_eq!(settings.embedding.base_url, "http://localhost:8080");
        assert_eq!(settings.llm.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.chunking.overlap = 500;
        assert!(matches!(settings.validate(), Err(DomainError::Config(_))));

        let mut settings = Settings::default();
        settings.ingest.batch_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.rag.top_k = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.ingest.on_failure = FailurePolicy::Retry {
            max_attempts: 0,
            backoff_ms: 10,
        };
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.llm.temperature = 3.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_token() {
        let settings = Settings::default();
        assert_eq!(
            settings.require_token(env(&[("HF_TOKEN", "hf_abc")])).unwrap(),
            "hf_abc"
        );
        assert!(settings.token(env(&[("HF_TOKEN", "  ")])).is_none());

        let err = settings.require_token(env(&[])).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("HF_TOKEN"));
    }
}

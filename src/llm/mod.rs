//! Language-model clients.
//!
//! The sentiment analyzer only needs "prompt in, text out"; this module
//! provides that capability for Ollama and Google Gemini.

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

use crate::config::{ModelConfig, ModelProvider};
use crate::error::ModelError;
use async_trait::async_trait;
use std::sync::Arc;

/// A text-completion capability.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a system instruction and a user prompt, returning the raw reply text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ModelError>;

    /// Name of the model used, for reports and logs.
    fn model_name(&self) -> &str;
}

/// Build the client selected by the configuration.
pub fn build_client(config: &ModelConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
    let client: Arc<dyn ModelClient> = match config.provider {
        ModelProvider::Ollama => Arc::new(OllamaClient::new(
            &config.ollama_url,
            &config.effective_model(),
            config.temperature,
            config.timeout_seconds,
        )?),
        ModelProvider::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or(ModelError::MissingApiKey)?;
            Arc::new(GeminiClient::new(
                &config.gemini_url,
                &config.effective_model(),
                api_key,
                config.temperature,
                config.timeout_seconds,
            )?)
        }
    };
    Ok(client)
}

/// Map a transport failure to a [`ModelError`].
pub(crate) fn map_send_error(e: reqwest::Error, base_url: &str, timeout_seconds: u64) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(timeout_seconds)
    } else if e.is_connect() {
        ModelError::Connect(base_url.to_string())
    } else {
        ModelError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ollama_client_uses_default_model() {
        let config = ModelConfig::default();
        let client = build_client(&config).unwrap();
        assert_eq!(client.model_name(), "llama3.2:latest");
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let config = ModelConfig {
            provider: ModelProvider::Gemini,
            api_key: None,
            ..ModelConfig::default()
        };
        assert!(matches!(
            build_client(&config),
            Err(ModelError::MissingApiKey)
        ));

        let config = ModelConfig {
            provider: ModelProvider::Gemini,
            api_key: Some("key".to_string()),
            ..ModelConfig::default()
        };
        let client = build_client(&config).unwrap();
        assert_eq!(client.model_name(), "gemini-2.5-flash-lite");
    }
}

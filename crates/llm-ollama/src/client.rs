//! Ollama HTTP client
//!
//! `generate` hands back the raw body on purpose: decoding into
//! [`GenerationResponse`](crate::GenerationResponse) is the caller's step, so a
//! malformed payload surfaces where the reply is composed rather than here.

use reqwest::Client;
use tracing::debug;

use crate::config::OllamaConfig;
use crate::error::{Error, Result};
use crate::types::{GenerationRequest, TagsResponse};

/// Ollama API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new client for the configured server
    pub fn new(config: &OllamaConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Create a client reusing an existing `reqwest` pool
    pub fn with_client(client: Client, config: &OllamaConfig) -> Self {
        Self {
            client,
            base_url: config.base_url().to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models the server currently has, in server order.
    ///
    /// Fails with [`Error::EmptyModelSet`] when the server reports none.
    pub async fn list_model_names(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        debug!("Listing Ollama models from {}", url);

        let body = self.client.get(&url).send().await?.bytes().await?;
        let tags: TagsResponse = serde_json::from_slice(&body)?;

        if tags.models.is_empty() {
            return Err(Error::EmptyModelSet);
        }

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Submit a non-streaming generation request and return the raw body
    pub async fn generate(&self, prompt: &str, model: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerationRequest::new(model, prompt);

        debug!(
            "Sending generate request to {} (model: {}, prompt: {} chars)",
            url,
            model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!("Ollama responded with HTTP {} ({} bytes)", status, body.len());
        Ok(body)
    }
}

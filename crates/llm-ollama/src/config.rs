//! Connection settings for the Ollama server

use serde::{Deserialize, Serialize};

/// Default address of a locally running Ollama instance
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama connection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    /// Base URL of the Ollama HTTP API (without the `/api` suffix)
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

impl OllamaConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Base URL with any trailing slashes removed, ready for path joining
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

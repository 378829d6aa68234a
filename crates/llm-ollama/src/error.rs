//! Error types for llm-ollama

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Ollama API operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no models available")]
    EmptyModelSet,

    #[error("Ollama error: {0}")]
    Server(String),
}

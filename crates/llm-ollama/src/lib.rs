//! Client for a local Ollama inference server
//!
//! Lists the models the server has loaded and submits non-streaming
//! generation requests.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::OllamaClient;
pub use config::OllamaConfig;
pub use error::{Error, Result};
pub use types::{GenerationRequest, GenerationResponse, ModelDescriptor, ModelDetails, TagsResponse};

//! Request and response payloads of the Ollama HTTP API

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Body of `GET /api/tags`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TagsResponse {
    pub models: Vec<ModelDescriptor>,
}

/// A model currently available on the server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub details: ModelDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelDetails {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub families: Option<Vec<String>>,
    #[serde(default)]
    pub parameter_size: String,
    #[serde(default)]
    pub quantization_level: String,
}

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Always false: replies are delivered as one payload
    pub stream: bool,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
        }
    }
}

/// Non-streaming reply from `POST /api/generate`.
///
/// Durations are reported by Ollama in nanoseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created_at: String,
    pub response: String,
    #[serde(default)]
    pub context: Vec<i64>,
    #[serde(default)]
    pub total_duration: i64,
    #[serde(default)]
    pub load_duration: i64,
    #[serde(default)]
    pub prompt_eval_count: i64,
    #[serde(default)]
    pub prompt_eval_duration: i64,
    #[serde(default)]
    pub eval_count: i64,
    #[serde(default)]
    pub eval_duration: i64,
    #[serde(default)]
    pub done: bool,
}

/// Shape Ollama uses when it rejects a request (unknown model, bad options)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl GenerationResponse {
    /// Decode a raw `/api/generate` body.
    ///
    /// An `{"error": ...}` object becomes [`Error::Server`]; anything else that
    /// does not match the response shape becomes [`Error::Decode`].
    pub fn from_body(body: &str) -> Result<Self> {
        if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
            return Err(Error::Server(error));
        }
        Ok(serde_json::from_str(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_request_never_streams() {
        let req = GenerationRequest::new("llama3", "why is the sky blue?");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "llama3",
                "prompt": "why is the sky blue?",
                "stream": false
            })
        );
    }

    #[test]
    fn test_decode_minimal_generation_response() {
        let body = r#"{"model":"llama3","response":"hello","done":true,"context":[1,2,3]}"#;
        let resp = GenerationResponse::from_body(body).unwrap();
        assert_eq!(resp.model, "llama3");
        assert_eq!(resp.response, "hello");
        assert!(resp.done);
        assert_eq!(resp.context, vec![1, 2, 3]);
        assert_eq!(resp.eval_count, 0);
    }

    #[test]
    fn test_decode_full_generation_response() {
        let body = r#"{
            "model": "mistral",
            "created_at": "2024-05-01T12:00:00.123Z",
            "response": "The sky is blue because of Rayleigh scattering.",
            "context": [42],
            "total_duration": 5043500667,
            "load_duration": 5025959,
            "prompt_eval_count": 26,
            "prompt_eval_duration": 325953000,
            "eval_count": 290,
            "eval_duration": 4709213000,
            "done": true
        }"#;
        let resp = GenerationResponse::from_body(body).unwrap();
        assert_eq!(resp.created_at, "2024-05-01T12:00:00.123Z");
        assert_eq!(resp.total_duration, 5_043_500_667);
        assert_eq!(resp.prompt_eval_count, 26);
        assert_eq!(resp.eval_count, 290);
    }

    #[test]
    fn test_decode_error_body_is_server_error() {
        let err = GenerationResponse::from_body(r#"{"error":"model 'nope' not found"}"#)
            .unwrap_err();
        match err {
            Error::Server(msg) => assert_eq!(msg, "model 'nope' not found"),
            other => panic!("expected Server error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed_body_is_decode_error() {
        let err = GenerationResponse::from_body("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_decode_missing_response_field_is_decode_error() {
        let err = GenerationResponse::from_body(r#"{"model":"llama3","done":true}"#).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_tags_response_with_details() {
        let body = r#"{"models":[{
            "name": "llama3:latest",
            "modified_at": "2024-05-01T10:00:00Z",
            "digest": "sha256:abc",
            "size": 4661224676,
            "details": {
                "format": "gguf",
                "family": "llama",
                "families": ["llama"],
                "parameter_size": "8.0B",
                "quantization_level": "Q4_0"
            }
        }]}"#;
        let tags: TagsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(tags.models.len(), 1);
        let model = &tags.models[0];
        assert_eq!(model.name, "llama3:latest");
        assert_eq!(model.size, 4_661_224_676);
        assert_eq!(model.details.quantization_level, "Q4_0");
        assert_eq!(model.details.families, Some(vec!["llama".to_string()]));
    }

    #[test]
    fn test_tags_response_null_families() {
        let body = r#"{"models":[{"name":"phi3","details":{"families":null}}]}"#;
        let tags: TagsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(tags.models[0].details.families, None);
    }
}

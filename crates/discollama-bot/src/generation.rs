//! Background generation: ask Ollama, then post the answer as replies
//!
//! Each invocation runs in its own task so the gateway event loop only waits
//! for the acknowledgment. Failures end the invocation and are logged; the
//! user just sees the acknowledgment go unanswered.

use std::sync::Arc;

use llm_ollama::{GenerationResponse, OllamaClient};
use serenity::async_trait;
use serenity::builder::CreateMessage;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, MessageId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunker::{chunk_text, DISCORD_MESSAGE_LIMIT};
use crate::errors::{log_bot_error, BotError};

const ACK_PREFIX: &str = "Asking AI... `";
const ACK_SUFFIX: &str = "`";

/// Where generated chunks are posted
#[async_trait]
pub trait ReplyTarget: Send + Sync {
    async fn reply(&self, content: &str) -> Result<(), BotError>;
}

#[async_trait]
impl<T: ReplyTarget + ?Sized> ReplyTarget for Arc<T> {
    async fn reply(&self, content: &str) -> Result<(), BotError> {
        (**self).reply(content).await
    }
}

/// Replies in the channel of, and referencing, the acknowledgment message
#[derive(Clone)]
pub struct AnchorMessage {
    http: Arc<Http>,
    channel_id: ChannelId,
    message_id: MessageId,
}

impl AnchorMessage {
    pub fn new(http: Arc<Http>, message: &Message) -> Self {
        Self {
            http,
            channel_id: message.channel_id,
            message_id: message.id,
        }
    }
}

#[async_trait]
impl ReplyTarget for AnchorMessage {
    async fn reply(&self, content: &str) -> Result<(), BotError> {
        let builder = CreateMessage::new()
            .content(content)
            .reference_message((self.channel_id, self.message_id));
        self.channel_id.send_message(&*self.http, builder).await?;
        Ok(())
    }
}

/// One prompt to run against one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub prompt: String,
    pub model: String,
}

/// Visible acknowledgment echoing the prompt.
///
/// Long prompts are shortened so the acknowledgment itself fits in a message.
pub fn acknowledgment_text(prompt: &str) -> String {
    let budget =
        DISCORD_MESSAGE_LIMIT - ACK_PREFIX.chars().count() - ACK_SUFFIX.chars().count();
    if prompt.chars().count() <= budget {
        return format!("{}{}{}", ACK_PREFIX, prompt, ACK_SUFFIX);
    }
    let shortened: String = prompt.chars().take(budget - 1).collect();
    format!("{}{}…{}", ACK_PREFIX, shortened, ACK_SUFFIX)
}

/// Run `job` and post the answer to `target`, one reply per chunk, in order.
///
/// Returns the number of replies sent. The first failed send ends the run.
pub async fn respond_with_generated_content<T: ReplyTarget + ?Sized>(
    ollama: &OllamaClient,
    target: &T,
    job: &GenerationJob,
    cancel: &CancellationToken,
) -> Result<usize, BotError> {
    let body = tokio::select! {
        _ = cancel.cancelled() => return Err(BotError::Cancelled),
        body = ollama.generate(&job.prompt, &job.model) => body?,
    };

    let response = GenerationResponse::from_body(&body)?;
    debug!(
        "Model '{}' produced {} chars ({} eval tokens, {} ms)",
        response.model,
        response.response.chars().count(),
        response.eval_count,
        response.total_duration / 1_000_000
    );

    if response.response.is_empty() {
        warn!("Model '{}' returned an empty response", job.model);
        return Ok(0);
    }

    let mut sent = 0;
    for chunk in chunk_text(&response.response, DISCORD_MESSAGE_LIMIT) {
        if cancel.is_cancelled() {
            return Err(BotError::Cancelled);
        }
        target.reply(chunk).await?;
        sent += 1;
    }

    Ok(sent)
}

/// Fire-and-forget wrapper around [`respond_with_generated_content`]
pub fn spawn_generation<T>(
    ollama: OllamaClient,
    target: T,
    job: GenerationJob,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    T: ReplyTarget + 'static,
{
    tokio::spawn(async move {
        match respond_with_generated_content(&ollama, &target, &job, &cancel).await {
            Ok(sent) => info!("Answered prompt with '{}' in {} message(s)", job.model, sent),
            Err(e) => log_bot_error(&format!("Generation with '{}' failed", job.model), &e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use llm_ollama::OllamaConfig;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTarget {
        sent: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    impl RecordingTarget {
        fn failing_on(index: usize) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_on: Some(index),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReplyTarget for RecordingTarget {
        async fn reply(&self, content: &str) -> Result<(), BotError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_on == Some(sent.len()) {
                return Err(BotError::Platform(serenity::Error::Other("send failed")));
            }
            sent.push(content.to_string());
            Ok(())
        }
    }

    fn job() -> GenerationJob {
        GenerationJob {
            prompt: "tell me a story".to_string(),
            model: "llama3".to_string(),
        }
    }

    async fn ollama_replying(server: &MockServer, text: &str) -> OllamaClient {
        let body = serde_json::json!({
            "model": "llama3",
            "created_at": "2024-05-01T12:00:00Z",
            "response": text,
            "context": [1, 2, 3],
            "done": true
        })
        .to_string();
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).body(body);
            })
            .await;
        OllamaClient::new(&OllamaConfig::new(server.base_url()))
    }

    async fn run(ollama: &OllamaClient, target: &RecordingTarget) -> Result<usize, BotError> {
        respond_with_generated_content(ollama, target, &job(), &CancellationToken::new()).await
    }

    // ── acknowledgment ────────────────────────────────────────────────────────

    #[test]
    fn test_acknowledgment_echoes_prompt() {
        assert_eq!(acknowledgment_text("why?"), "Asking AI... `why?`");
    }

    #[test]
    fn test_acknowledgment_fits_message_limit() {
        let prompt = "p".repeat(5000);
        let ack = acknowledgment_text(&prompt);
        assert_eq!(ack.chars().count(), DISCORD_MESSAGE_LIMIT);
        assert!(ack.starts_with("Asking AI... `ppp"));
        assert!(ack.ends_with("…`"));
    }

    // ── respond_with_generated_content ────────────────────────────────────────

    #[tokio::test]
    async fn test_short_response_is_one_reply() {
        let server = MockServer::start_async().await;
        let ollama = ollama_replying(&server, "Once upon a time.").await;
        let target = RecordingTarget::default();

        let sent = run(&ollama, &target).await.unwrap();

        assert_eq!(sent, 1);
        assert_eq!(target.sent(), vec!["Once upon a time."]);
    }

    #[tokio::test]
    async fn test_long_response_is_chunked_in_order() {
        let server = MockServer::start_async().await;
        let text = format!("{}{}", "a".repeat(2000), "b".repeat(500));
        let ollama = ollama_replying(&server, &text).await;
        let target = RecordingTarget::default();

        let sent = run(&ollama, &target).await.unwrap();

        assert_eq!(sent, 2);
        let replies = target.sent();
        assert_eq!(replies[0], "a".repeat(2000));
        assert_eq!(replies[1], "b".repeat(500));
    }

    #[tokio::test]
    async fn test_send_failure_stops_later_chunks() {
        let server = MockServer::start_async().await;
        let text = "x".repeat(4500);
        let ollama = ollama_replying(&server, &text).await;
        let target = RecordingTarget::failing_on(1);

        let err = run(&ollama, &target).await.unwrap_err();

        assert!(matches!(err, BotError::Platform(_)));
        assert_eq!(target.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_response_sends_nothing() {
        let server = MockServer::start_async().await;
        let ollama = ollama_replying(&server, "").await;
        let target = RecordingTarget::default();

        let sent = run(&ollama, &target).await.unwrap();

        assert_eq!(sent, 0);
        assert!(target.sent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(502).body("Bad Gateway");
            })
            .await;
        let ollama = OllamaClient::new(&OllamaConfig::new(server.base_url()));
        let target = RecordingTarget::default();

        let err = run(&ollama, &target).await.unwrap_err();

        assert!(matches!(err, BotError::Inference(llm_ollama::Error::Decode(_))));
        assert!(target.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_model_is_server_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body(r#"{"error":"model 'ghost' not found"}"#);
            })
            .await;
        let ollama = OllamaClient::new(&OllamaConfig::new(server.base_url()));
        let target = RecordingTarget::default();

        let err = run(&ollama, &target).await.unwrap_err();

        assert!(matches!(err, BotError::Inference(llm_ollama::Error::Server(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let server = MockServer::start_async().await;
        let ollama = ollama_replying(&server, "never sent").await;
        let target = RecordingTarget::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = respond_with_generated_content(&ollama, &target, &job(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::Cancelled));
        assert!(target.sent().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_generation_delivers_replies() {
        let server = MockServer::start_async().await;
        let ollama = ollama_replying(&server, "done").await;
        let target = Arc::new(RecordingTarget::default());

        spawn_generation(ollama, target.clone(), job(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(target.sent(), vec!["done"]);
    }
}

//! Process-wide state shared by every event handler invocation

use llm_ollama::OllamaClient;
use tokio_util::sync::CancellationToken;

use crate::health::AppState;

/// Built once in `main` and shared behind an `Arc`; never mutated afterwards.
pub struct BotContext {
    pub ollama: OllamaClient,
    /// Model names offered as `/generate` choices, in Ollama's order
    pub models: Vec<String>,
    /// Answer `!discollama <prompt>` messages as well as `/generate`
    pub prefix_commands: bool,
    pub health: AppState,
    /// Parent token for spawned generations. Nothing cancels it at shutdown;
    /// in-flight work runs to completion.
    pub generations: CancellationToken,
}

impl BotContext {
    pub fn new(ollama: OllamaClient, models: Vec<String>, prefix_commands: bool) -> Self {
        let health = AppState::new(models.len());
        Self {
            ollama,
            models,
            prefix_commands,
            health,
            generations: CancellationToken::new(),
        }
    }

    /// Model used by prefix commands, which carry no model option
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}

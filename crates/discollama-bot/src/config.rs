//! Configuration management for discollama-bot

#[path = "config_tests.rs"]
mod config_tests;

use anyhow::{bail, Context, Result};
use llm_ollama::OllamaConfig;
use serde::{Deserialize, Serialize};
use std::fs;

/// Environment lookup, swappable in tests
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordBotConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Discord bot specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordBotConfig {
    /// Bot token from the Discord developer portal
    #[serde(default)]
    pub bot_token: String,
    /// Test guild. When unset, commands are registered globally
    #[serde(default)]
    pub guild_id: Option<u64>,
    /// Remove registered commands on shutdown
    #[serde(default = "default_true")]
    pub remove_commands: bool,
    /// Also answer `!discollama <prompt>` messages (needs the message content intent)
    #[serde(default)]
    pub prefix_commands: bool,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env<E: ReadEnv>(env: &E) -> Result<Self> {
        let bot_token = env.var("DISCORD_BOT_TOKEN").unwrap_or_default();

        let guild_id = match env.var("DISCORD_GUILD_ID").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("DISCORD_GUILD_ID is not a valid id: {}", raw))?,
            ),
            None => None,
        };

        let remove_commands = env
            .var("DISCORD_REMOVE_COMMANDS")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);

        let prefix_commands = env
            .var("DISCOLLAMA_PREFIX_COMMANDS")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false);

        let ollama = env
            .var("OLLAMA_URL")
            .filter(|v| !v.is_empty())
            .map(OllamaConfig::new)
            .unwrap_or_default();

        Ok(Config {
            discord: DiscordBotConfig {
                bot_token,
                guild_id,
                remove_commands,
                prefix_commands,
            },
            ollama,
        })
    }

    /// Reject configurations the bot cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            bail!("Discord bot token is required (--token or DISCORD_BOT_TOKEN)");
        }
        if self.ollama.url.trim().is_empty() {
            bail!("Ollama URL must not be empty");
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

//! Application command schema, dispatch, and registration
//!
//! The bot exposes a single `/generate` command whose `model` option is an
//! enumerated choice list filled from the models Ollama reports at startup.

use std::collections::HashMap;

use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::http::Http;
use serenity::model::application::{Command, CommandOptionType, ResolvedOption, ResolvedValue};
use serenity::model::id::{CommandId, GuildId};
use tracing::{info, warn};

use crate::errors::{log_error, BotError};

pub const GENERATE_COMMAND: &str = "generate";
pub const MODEL_OPTION: &str = "model";
pub const PROMPT_OPTION: &str = "prompt";

/// Discord caps a string option at this many choices
pub const MAX_CHOICES: usize = 25;

/// Message prefix that triggers a generation without a slash command
pub const MESSAGE_PREFIX: &str = "!discollama ";

// ── Schema ─────────────────────────────────────────────────────────────────

/// Platform-independent description of a command we register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSchema {
    pub name: String,
    pub description: String,
    pub options: Vec<OptionSchema>,
}

/// A required-or-optional string option, optionally restricted to choices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSchema {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// Empty means free text
    pub choices: Vec<String>,
}

impl CommandSchema {
    /// The `/generate` command offering `models` as `model` choices, in order
    pub fn generate(models: &[String]) -> Self {
        if models.len() > MAX_CHOICES {
            warn!(
                "Ollama reports {} models; only the first {} can be offered as choices",
                models.len(),
                MAX_CHOICES
            );
        }

        Self {
            name: GENERATE_COMMAND.to_string(),
            description: "Generates a response from the AI".to_string(),
            options: vec![
                OptionSchema {
                    name: MODEL_OPTION.to_string(),
                    description: "LLM Model".to_string(),
                    required: true,
                    choices: models.iter().take(MAX_CHOICES).cloned().collect(),
                },
                OptionSchema {
                    name: PROMPT_OPTION.to_string(),
                    description: "LLM Prompt".to_string(),
                    required: true,
                    choices: Vec::new(),
                },
            ],
        }
    }

    pub fn option(&self, name: &str) -> Option<&OptionSchema> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Serenity builder for registering this schema
    pub fn to_builder(&self) -> CreateCommand {
        self.options.iter().fold(
            CreateCommand::new(&self.name).description(&self.description),
            |command, opt| {
                let option = opt.choices.iter().fold(
                    CreateCommandOption::new(CommandOptionType::String, &opt.name, &opt.description)
                        .required(opt.required),
                    |option, choice| option.add_string_choice(choice, choice),
                );
                command.add_option(option)
            },
        )
    }
}

// ── Dispatch ───────────────────────────────────────────────────────────────

/// Commands this bot knows how to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Generate { model: String, prompt: String },
}

impl BotCommand {
    /// Resolve an invocation by name.
    ///
    /// Unknown names return `Ok(None)` so newer commands registered elsewhere
    /// do not trip up this bot.
    pub fn parse(name: &str, options: &HashMap<String, String>) -> Result<Option<Self>, BotError> {
        match name {
            GENERATE_COMMAND => {
                let model = options
                    .get(MODEL_OPTION)
                    .ok_or(BotError::MissingOption(MODEL_OPTION))?;
                let prompt = options
                    .get(PROMPT_OPTION)
                    .ok_or(BotError::MissingOption(PROMPT_OPTION))?;
                Ok(Some(BotCommand::Generate {
                    model: model.clone(),
                    prompt: prompt.clone(),
                }))
            }
            _ => Ok(None),
        }
    }
}

/// Collect the string-valued options of an interaction by name
pub fn string_options(options: &[ResolvedOption<'_>]) -> HashMap<String, String> {
    options
        .iter()
        .filter_map(|opt| match opt.value {
            ResolvedValue::String(s) => Some((opt.name.to_string(), s.to_string())),
            _ => None,
        })
        .collect()
}

/// Extract the prompt from a `!discollama <prompt>` message.
///
/// The prefix is matched case-insensitively; the prompt is trimmed and
/// lower-cased.
pub fn parse_prefix_command(content: &str) -> Option<String> {
    let head = content.get(..MESSAGE_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(MESSAGE_PREFIX) {
        return None;
    }
    let prompt = content[MESSAGE_PREFIX.len()..].trim().to_lowercase();
    if prompt.is_empty() {
        return None;
    }
    Some(prompt)
}

// ── Registration ───────────────────────────────────────────────────────────

/// Where commands are registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandScope {
    /// Visible in every guild; propagation can take a while
    Global,
    /// Visible immediately, only in one (test) guild
    Guild(GuildId),
}

impl CommandScope {
    pub fn from_guild_id(guild_id: Option<u64>) -> Self {
        match guild_id {
            Some(id) if id != 0 => CommandScope::Guild(GuildId::new(id)),
            _ => CommandScope::Global,
        }
    }
}

/// A command Discord accepted, with the id needed to remove it again
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    pub id: CommandId,
    pub schema: CommandSchema,
}

/// Creates and deletes application commands in one scope
#[derive(Debug, Clone, Copy)]
pub struct CommandRegistrar {
    scope: CommandScope,
}

impl CommandRegistrar {
    pub fn new(scope: CommandScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> CommandScope {
        self.scope
    }

    pub async fn register(
        &self,
        http: &Http,
        schema: CommandSchema,
    ) -> Result<RegisteredCommand, BotError> {
        let builder = schema.to_builder();
        let command = match self.scope {
            CommandScope::Global => Command::create_global_command(http, builder).await?,
            CommandScope::Guild(guild_id) => guild_id.create_command(http, builder).await?,
        };
        info!("Registered '{}' command (id {})", schema.name, command.id);
        Ok(RegisteredCommand {
            id: command.id,
            schema,
        })
    }

    /// Register every schema, stopping at the first failure
    pub async fn register_all(
        &self,
        http: &Http,
        schemas: Vec<CommandSchema>,
    ) -> Result<Vec<RegisteredCommand>, BotError> {
        let mut registered = Vec::with_capacity(schemas.len());
        for schema in schemas {
            registered.push(self.register(http, schema).await?);
        }
        Ok(registered)
    }

    /// Delete previously registered commands.
    ///
    /// A failed deletion is logged and the rest are still attempted. Returns
    /// the number of commands that could not be removed.
    pub async fn unregister_all(&self, http: &Http, commands: &[RegisteredCommand]) -> usize {
        let mut failures = 0;
        for command in commands {
            let result = match self.scope {
                CommandScope::Global => Command::delete_global_command(http, command.id).await,
                CommandScope::Guild(guild_id) => guild_id.delete_command(http, command.id).await,
            };
            match result {
                Ok(()) => info!("Removed '{}' command", command.schema.name),
                Err(e) => {
                    failures += 1;
                    log_error(
                        &format!("Cannot delete '{}' command", command.schema.name),
                        &e,
                    );
                }
            }
        }
        failures
    }
}

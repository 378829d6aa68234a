//! Serenity event handler implementation

use std::sync::Arc;

use serenity::async_trait;
use serenity::builder::{CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::model::application::{CommandInteraction, Interaction};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, info, warn};

use crate::commands::{parse_prefix_command, string_options, BotCommand};
use crate::context::BotContext;
use crate::errors::{log_bot_error, log_error};
use crate::generation::{acknowledgment_text, spawn_generation, AnchorMessage, GenerationJob};

pub struct Handler {
    bot: Arc<BotContext>,
}

impl Handler {
    pub fn new(bot: Arc<BotContext>) -> Self {
        Self { bot }
    }

    async fn handle_command(&self, ctx: &Context, cmd: &CommandInteraction) {
        let options = string_options(&cmd.data.options());
        let command = match BotCommand::parse(&cmd.data.name, &options) {
            Ok(Some(command)) => command,
            Ok(None) => {
                debug!("Ignoring unknown command '{}'", cmd.data.name);
                return;
            }
            Err(e) => {
                log_bot_error(&format!("Rejected '{}' invocation", cmd.data.name), &e);
                return;
            }
        };

        match command {
            BotCommand::Generate { model, prompt } => {
                self.generate_for_interaction(ctx, cmd, GenerationJob { prompt, model })
                    .await
            }
        }
    }

    /// Acknowledge within the interaction deadline, then hand off to a task
    async fn generate_for_interaction(
        &self,
        ctx: &Context,
        cmd: &CommandInteraction,
        job: GenerationJob,
    ) {
        info!(
            "/generate from {} with model '{}' ({} chars)",
            cmd.user.name,
            job.model,
            job.prompt.chars().count()
        );

        let ack = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new().content(acknowledgment_text(&job.prompt)),
        );
        if let Err(e) = cmd.create_response(&ctx.http, ack).await {
            log_error("Failed to acknowledge interaction", &e);
            return;
        }

        let anchor = match cmd.get_response(&ctx.http).await {
            Ok(message) => message,
            Err(e) => {
                log_error("Failed to fetch acknowledgment message", &e);
                return;
            }
        };

        self.dispatch(ctx, &anchor, job);
    }

    async fn generate_for_message(&self, ctx: &Context, msg: &Message, prompt: String) {
        let Some(model) = self.bot.default_model() else {
            warn!("Prefix command received but no model is available");
            return;
        };
        let job = GenerationJob {
            prompt,
            model: model.to_string(),
        };

        info!(
            "Prefix command from {} with model '{}' ({} chars)",
            msg.author.name,
            job.model,
            job.prompt.chars().count()
        );

        let anchor = match msg.reply(&ctx.http, acknowledgment_text(&job.prompt)).await {
            Ok(message) => message,
            Err(e) => {
                log_error("Failed to acknowledge prefix command", &e);
                return;
            }
        };

        self.dispatch(ctx, &anchor, job);
    }

    fn dispatch(&self, ctx: &Context, anchor: &Message, job: GenerationJob) {
        spawn_generation(
            self.bot.ollama.clone(),
            AnchorMessage::new(ctx.http.clone(), anchor),
            job,
            self.bot.generations.child_token(),
        );
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Logged in as: {}#{:04}",
            ready.user.name,
            ready.user.discriminator.map_or(0, |d| d.get())
        );
        self.bot.health.set_bot_username(ready.user.name.clone()).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(cmd) => self.handle_command(&ctx, &cmd).await,
            _ => {
                // Components, autocomplete and modals are never registered by this bot
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if !self.bot.prefix_commands || msg.author.bot {
            return;
        }
        if let Some(prompt) = parse_prefix_command(&msg.content) {
            self.generate_for_message(&ctx, &msg, prompt).await;
        }
    }
}

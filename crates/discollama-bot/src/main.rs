//! discollama: a Discord bot for a local Ollama server
//!
//! Registers a `/generate` slash command whose model choices come from the
//! Ollama server, and answers each invocation with the generated text.

mod chunker;
mod commands;
mod config;
mod context;
mod errors;
mod generation;
mod handlers;
mod health;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use llm_ollama::{OllamaClient, OllamaConfig};
use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{CommandRegistrar, CommandSchema, CommandScope};
use crate::config::{Config, SystemEnv};
use crate::context::BotContext;
use crate::handlers::Handler;

/// discollama CLI
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/discollama.toml")]
    config: String,

    /// Discord bot token (overrides config file)
    #[arg(long, env = "DISCORD_BOT_TOKEN")]
    token: Option<String>,

    /// Test guild ID. If not passed, commands are registered globally
    #[arg(long, env = "DISCORD_GUILD_ID")]
    guild: Option<u64>,

    /// Remove registered commands on shutdown
    #[arg(
        long = "rmcmd",
        env = "DISCORD_REMOVE_COMMANDS",
        value_parser = BoolishValueParser::new()
    )]
    remove_commands: Option<bool>,

    /// Answer `!discollama <prompt>` messages too
    #[arg(long, env = "DISCOLLAMA_PREFIX_COMMANDS", value_parser = BoolishValueParser::new())]
    prefix_commands: Option<bool>,

    /// Ollama API URL
    #[arg(long, env = "OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Serve /health and /live on this port
    #[arg(long, env = "HEALTH_CHECK_PORT")]
    health_port: Option<u16>,
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(token) = &args.token {
        config.discord.bot_token = token.clone();
    }
    if let Some(guild) = args.guild {
        config.discord.guild_id = Some(guild);
    }
    if let Some(remove) = args.remove_commands {
        config.discord.remove_commands = remove;
    }
    if let Some(prefix) = args.prefix_commands {
        config.discord.prefix_commands = prefix;
    }
    if let Some(url) = &args.ollama_url {
        config.ollama = OllamaConfig::new(url.clone());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discollama_bot=debug,llm_ollama=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting discollama");

    let args = Args::parse();

    let mut config = if std::path::Path::new(&args.config).exists() {
        info!("Loading config from file: {}", args.config);
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, loading from environment");
        Config::from_env(&SystemEnv)?
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    // Without at least one model there is nothing to offer.
    let ollama = OllamaClient::new(&config.ollama);
    info!("Checking for available ollama models at {}...", ollama.base_url());
    let models = ollama
        .list_model_names()
        .await
        .context("Cannot get models")?;
    info!("Found {} model(s): {}", models.len(), models.join(", "));

    let bot = Arc::new(BotContext::new(
        ollama,
        models,
        config.discord.prefix_commands,
    ));

    let mut intents = GatewayIntents::GUILDS;
    if config.discord.prefix_commands {
        intents |= GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;
    }

    let mut client = Client::builder(&config.discord.bot_token, intents)
        .event_handler(Handler::new(bot.clone()))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Discord client: {}", e))?;

    let http = client.http.clone();
    let app = http
        .get_current_application_info()
        .await
        .context("Invalid bot parameters")?;
    http.set_application_id(app.id);

    info!("Adding commands...");
    let registrar = CommandRegistrar::new(CommandScope::from_guild_id(config.discord.guild_id));
    match registrar.scope() {
        CommandScope::Global => info!("Registering commands globally"),
        CommandScope::Guild(guild_id) => info!("Registering commands in guild {}", guild_id),
    }
    let registered = registrar
        .register_all(&http, vec![CommandSchema::generate(&bot.models)])
        .await
        .context("Cannot create commands")?;

    if let Some(port) = args.health_port {
        let health_state = bot.health.clone();
        tokio::spawn(async move {
            if let Err(e) = health::start_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        });
    }

    // Graceful shutdown: close all shards on SIGTERM or Ctrl+C.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!("Cannot install SIGTERM handler ({}); waiting for Ctrl+C", e);
                    tokio::signal::ctrl_c().await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
        }
        info!("Shutdown signal received, stopping Discord client...");
        shard_manager.shutdown_all().await;
    });

    info!("Press Ctrl+C to exit");

    // Blocks until all shards are stopped
    let run = client.start().await;

    if config.discord.remove_commands {
        info!("Removing commands...");
        let failures = registrar.unregister_all(&http, &registered).await;
        if failures > 0 {
            warn!("{} command(s) could not be removed", failures);
        }
    }

    run.map_err(|e| anyhow::anyhow!("Discord client error: {}", e))?;

    info!("Gracefully shutting down.");
    Ok(())
}

//! Error handling for the bot.
//!
//! `BotError` covers everything that can end a single invocation. Discord
//! failures are classified by HTTP status so `log_error` can pick the level:
//! permanent rejections (bad permissions, unknown channel) are `error!`,
//! network blips and rate limits are `warn!`.

use serenity::http::HttpError;
use thiserror::Error;
use tracing::{error, warn};

/// Failures that end one command invocation
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Inference error: {0}")]
    Inference(#[from] llm_ollama::Error),

    #[error("Discord error: {0}")]
    Platform(#[from] serenity::Error),

    #[error("Missing required option '{0}'")]
    MissingOption(&'static str),

    #[error("Generation cancelled")]
    Cancelled,
}

/// How bad a Discord API failure is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Discord rejected the request; repeating it will not help
    Permanent,
    /// HTTP 429
    RateLimited,
    /// Network failure or server-side trouble
    Transient,
}

/// Classify a serenity `Error`
pub fn classify(err: &serenity::Error) -> Severity {
    match err {
        serenity::Error::Http(http_err) => classify_http(http_err),
        _ => Severity::Transient,
    }
}

fn classify_http(http_err: &HttpError) -> Severity {
    match http_err {
        HttpError::UnsuccessfulRequest(resp) => classify_status(resp.status_code.as_u16()),
        // Network / request-level failures (not Discord API errors)
        _ => Severity::Transient,
    }
}

/// Discord's JSON error code, when the API answered with one
fn discord_code(err: &serenity::Error) -> Option<isize> {
    match err {
        serenity::Error::Http(http_err) => http_code(http_err),
        _ => None,
    }
}

fn http_code(http_err: &HttpError) -> Option<isize> {
    match http_err {
        HttpError::UnsuccessfulRequest(resp) => Some(resp.error.code),
        _ => None,
    }
}

fn classify_status(status: u16) -> Severity {
    match status {
        429 => Severity::RateLimited,
        400..=499 => Severity::Permanent,
        _ => Severity::Transient,
    }
}

/// Log a serenity error at the level its severity calls for
pub fn log_error(context: &str, err: &serenity::Error) {
    match (classify(err), discord_code(err)) {
        (Severity::Permanent, Some(code)) => error!("{} [code {}]: {}", context, code, err),
        (Severity::Permanent, None) => error!("{}: {}", context, err),
        (Severity::RateLimited, _) => warn!("{}: rate limited: {}", context, err),
        (Severity::Transient, _) => warn!("{}: {}", context, err),
    }
}

/// Log any invocation failure; Discord errors go through [`log_error`]
pub fn log_bot_error(context: &str, err: &BotError) {
    match err {
        BotError::Platform(e) => log_error(context, e),
        BotError::Cancelled => warn!("{}: {}", context, err),
        _ => error!("{}: {}", context, err),
    }
}

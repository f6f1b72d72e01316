//! Simple Bot Example
//!
//! Slash commands, a command parameter and two event handlers.
//!
//! # Usage
//!
//! ```bash
//! BOT_TOKEN=... cargo run --package simple-bot
//! BOT_TOKEN=... cargo run --package simple-bot -- --webhook --quiet
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use maxbot::prelude::*;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "A simple MAX bot")]
struct Cli {
    /// Do not dump every update and reply to the log.
    #[arg(short, long)]
    quiet: bool,

    /// Serve a webhook instead of long polling.
    #[arg(long)]
    webhook: bool,

    /// Extra configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

const HELP: &str = "Available commands:
/start - Start the bot
/help - Show this help
/echo <text> - Echo your text
";

// ============================================================================
// Handlers
// ============================================================================

async fn echo(param: Param, ctx: Context) -> Result<Value, ApiError> {
    if param.is_empty() {
        return ctx.reply("Usage: /echo <your text>").await;
    }
    ctx.reply(&format!("You said: {}", param.text())).await
}

async fn greet(ctx: Context) -> Result<Value, ApiError> {
    let name = ctx
        .update()
        .get("user.name")
        .and_then(Value::as_str)
        .unwrap_or("User")
        .to_string();
    ctx.reply(&format!(
        "Hello, {name}! Thanks for starting the bot. Use /help to see what I can do."
    ))
    .await
}

/// Answers plain messages, leaving anything that looks like a command alone.
async fn fallback(param: Param, ctx: Context) -> Result<Option<Value>, ApiError> {
    if param.is_empty() || param.text().starts_with('/') {
        return Ok(None);
    }
    ctx.reply("I received your message. Use /help to see available commands.")
        .await
        .map(Some)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }

    let bot = MaxBot::from_config(loader.load()?)?
        .verbose(!cli.quiet)
        .describe_command("start", "Start the bot")
        .describe_command("help", "Show help")
        .describe_command("echo", "Echo your message")
        .command(
            "start",
            "Welcome! I'm a simple MAX bot.\nUse /help to see available commands.",
        )
        .command("help", HELP)
        .command("echo", echo)
        .on(update_type::BOT_STARTED, greet)
        .on(update_type::MESSAGE_CREATED, fallback);

    info!("Starting Simple Bot...");
    if cli.webhook {
        bot.start_webhook().await?;
    } else {
        bot.start_polling(Vec::new()).await?;
    }
    Ok(())
}

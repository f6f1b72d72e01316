//! Keyboard Bot Example
//!
//! Inline keyboards, regex callback actions and request buttons.
//!
//! # Usage
//!
//! ```bash
//! BOT_TOKEN=... cargo run --package keyboard-bot
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use maxbot::prelude::*;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Inline keyboard showcase for MAX")]
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

/// Rows appended to every keyboard.
fn default_rows() -> Vec<Vec<Button>> {
    vec![
        vec![Button::link("❤️", "https://dev.max.ru/")],
        vec![Button::callback("Remove message", "remove_message").intent(Intent::Negative)],
    ]
}

async fn send_keyboard(ctx: &Context, text: &str, keyboard: InlineKeyboard) -> Result<Value, ApiError> {
    ctx.reply_with(text, json!({ "attachments": [keyboard.into_attachment()] }))
        .await
}

// ============================================================================
// Commands
// ============================================================================

async fn callback_keyboard(ctx: Context) -> Result<Value, ApiError> {
    let keyboard = InlineKeyboard::new()
        .row([
            Button::callback("default", "color:default"),
            Button::callback("positive", "color:positive").intent(Intent::Positive),
            Button::callback("negative", "color:negative").intent(Intent::Negative),
        ])
        .rows(default_rows());
    send_keyboard(&ctx, "Callback keyboard", keyboard).await
}

async fn geo_keyboard(ctx: Context) -> Result<Value, ApiError> {
    let keyboard = InlineKeyboard::new()
        .row([Button::request_geo_location("Send geoLocation")])
        .rows(default_rows());
    send_keyboard(&ctx, "GeoLocation keyboard", keyboard).await
}

async fn contact_keyboard(ctx: Context) -> Result<Value, ApiError> {
    let keyboard = InlineKeyboard::new()
        .row([Button::request_contact("Send my contact")])
        .rows(default_rows());
    send_keyboard(&ctx, "Contact keyboard", keyboard).await
}

async fn create_chat(param: Param, ctx: Context) -> Result<Value, ApiError> {
    let title = param.text().trim();
    if title.is_empty() {
        return ctx.reply("Enter chat title after command").await;
    }
    let keyboard = InlineKeyboard::new().row([Button::chat(format!("Create chat \"{title}\""), title)]);
    send_keyboard(&ctx, "Create chat keyboard", keyboard).await
}

// ============================================================================
// Actions
// ============================================================================

async fn remove_message(ctx: Context) -> Result<Option<Value>, ApiError> {
    let Some(message_id) = ctx.update().message_id().map(str::to_string) else {
        return Ok(None);
    };
    let removed = ctx
        .api()
        .delete_message(&message_id)
        .await
        .ok()
        .and_then(|result| result.get("success").and_then(Value::as_bool))
        .unwrap_or(false);

    let notification = if removed {
        "Successfully removed message"
    } else {
        "Failed to remove message"
    };
    ctx.answer(json!({ "notification": notification })).await.map(Some)
}

async fn pick_color(param: Param, ctx: Context) -> Result<Value, ApiError> {
    let color = param.group(1).unwrap_or_default().to_string();
    ctx.answer(json!({
        "message": { "text": format!("Your choice: {color} color"), "attachments": [] }
    }))
    .await
}

// ============================================================================
// Events
// ============================================================================

/// Echoes shared locations and contacts back to the user.
async fn shared_data(ctx: Context) -> Result<Option<Value>, ApiError> {
    let update = ctx.update();

    if let Some(location) = update.get("message.location") {
        let lat = location.get("latitude").cloned().unwrap_or(Value::Null);
        let lon = location.get("longitude").cloned().unwrap_or(Value::Null);
        return ctx.reply(&format!("Your location: {lat}, {lon}")).await.map(Some);
    }

    if let Some(contact) = update.get("message.contact_info") {
        let field = |key: &str| {
            contact
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string()
        };
        let text = format!("Your name: {}\nYour phone: {}", field("full_name"), field("tel"));
        return ctx.reply(&text).await.map(Some);
    }

    Ok(None)
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
        .describe_command("callback", "Send callback keyboard")
        .describe_command("geoLocation", "Send geoLocation request")
        .describe_command("contact", "Send contact request")
        .describe_command("createChat", "Create chat")
        .command("callback", callback_keyboard)
        .command("geoLocation", geo_keyboard)
        .command("contact", contact_keyboard)
        .command("createChat", create_chat)
        .action("remove_message", remove_message)?
        .action("color:(.+)", pick_color)?
        .on(update_type::MESSAGE_CREATED, shared_data);

    info!("Starting Keyboard Bot...");
    if cli.webhook {
        bot.start_webhook().await?;
    } else {
        bot.start_polling(Vec::new()).await?;
    }
    Ok(())
}

//! Slash commands: `/start` and `/help`.

use std::sync::Arc;

use podium_core::{Config, Engine, Event};
use teloxide::prelude::*;
use teloxide::types::Message as TgMessage;
use teloxide::utils::command::BotCommands;

use crate::handlers::{ERROR_REPLY, deliver};
use crate::startup::actor;

/// All slash commands supported by the bot.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    /// Register, or return to the main menu.
    #[command(description = "Open the main menu")]
    Start,
    /// Show available commands.
    #[command(description = "Show available commands")]
    Help,
}

pub async fn handle_command(
    bot: Bot,
    msg: TgMessage,
    cmd: Command,
    config: Arc<Config>,
    engine: Arc<Engine>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => cmd_start(&bot, &msg, &config, &engine).await,
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
            Ok(())
        }
    }
}

async fn cmd_start(
    bot: &Bot,
    msg: &TgMessage,
    config: &Config,
    engine: &Engine,
) -> ResponseResult<()> {
    let Some(actor) = msg.from.as_ref().and_then(|u| actor(config, u.id.0)) else {
        return Ok(());
    };
    match engine.handle(&actor, Event::Start).await {
        Ok(outputs) => deliver(bot, config, msg.chat.id, outputs, None, Some(msg.id)).await,
        Err(e) => {
            tracing::error!(user = actor.user_id, error = %e, "start failed");
            bot.send_message(msg.chat.id, ERROR_REPLY).await?;
            Ok(())
        }
    }
}

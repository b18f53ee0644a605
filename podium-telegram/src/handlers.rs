//! Message, document and callback handlers.
//!
//! Each handler turns a Telegram update into an [`Event`], runs it through
//! the [`Engine`] and delivers the resulting outputs to the chat.

use std::sync::Arc;

use podium_core::engine::ExportFile;
use podium_core::{Action, Config, Engine, Event, Output};
use teloxide::net::Download;
use teloxide::payloads::{
    AnswerCallbackQuerySetters, EditMessageTextSetters, SendDocumentSetters, SendMessageSetters,
};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, InlineKeyboardMarkup, InputFile, Message as TgMessage, MessageId,
};

use crate::notifier::delete_later;
use crate::render;
use crate::startup::actor;

/// Reply sent when the engine fails.
pub const ERROR_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Reply to a document that is not a `.csv` file.
const NOT_CSV_REPLY: &str = "Please send the schedule as a .csv file.";

/// Reply to a schedule that is not valid UTF-8 text.
const NOT_TEXT_REPLY: &str = "The file is not UTF-8 text. Please save it as UTF-8 CSV.";

/// Whether a document name looks like a schedule.
pub fn is_schedule_file(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.to_ascii_lowercase().ends_with(".csv"))
}

/// Free text goes to the wizard; anything else is deleted from the chat.
pub async fn handle_message(
    bot: Bot,
    msg: TgMessage,
    config: Arc<Config>,
    engine: Arc<Engine>,
) -> ResponseResult<()> {
    let Some(actor) = msg.from.as_ref().and_then(|u| actor(&config, u.id.0)) else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        bot.delete_message(msg.chat.id, msg.id).await.ok();
        return Ok(());
    };

    match engine.handle(&actor, Event::Text(text.to_string())).await {
        Ok(outputs) => deliver(&bot, &config, msg.chat.id, outputs, None, Some(msg.id)).await,
        Err(e) => {
            tracing::error!(user = actor.user_id, error = %e, "message handling failed");
            bot.send_message(msg.chat.id, ERROR_REPLY).await?;
            Ok(())
        }
    }
}

/// Schedule uploads. Documents outside the upload step are deleted.
pub async fn handle_document(
    bot: Bot,
    msg: TgMessage,
    config: Arc<Config>,
    engine: Arc<Engine>,
) -> ResponseResult<()> {
    let Some(actor) = msg.from.as_ref().and_then(|u| actor(&config, u.id.0)) else {
        return Ok(());
    };
    let Some(document) = msg.document() else {
        return Ok(());
    };

    match engine.accepts_upload(&actor).await {
        Ok(true) => {}
        Ok(false) => {
            bot.delete_message(msg.chat.id, msg.id).await.ok();
            return Ok(());
        }
        Err(e) => {
            tracing::error!(user = actor.user_id, error = %e, "upload check failed");
            bot.send_message(msg.chat.id, ERROR_REPLY).await?;
            return Ok(());
        }
    }

    if !is_schedule_file(document.file_name.as_deref()) {
        bot.send_message(msg.chat.id, NOT_CSV_REPLY).await?;
        return Ok(());
    }

    let file = bot.get_file(document.file.id.clone()).await?;
    let mut bytes = Vec::new();
    if let Err(e) = bot.download_file(&file.path, &mut bytes).await {
        tracing::error!(user = actor.user_id, error = %e, "schedule download failed");
        bot.send_message(msg.chat.id, ERROR_REPLY).await?;
        return Ok(());
    }
    let Ok(text) = String::from_utf8(bytes) else {
        bot.send_message(msg.chat.id, NOT_TEXT_REPLY).await?;
        return Ok(());
    };

    tracing::info!(user = actor.user_id, size = text.len(), "schedule received");
    match engine.handle(&actor, Event::Upload(text)).await {
        Ok(outputs) => deliver(&bot, &config, msg.chat.id, outputs, None, Some(msg.id)).await,
        Err(e) => {
            tracing::error!(user = actor.user_id, error = %e, "schedule import failed");
            bot.send_message(msg.chat.id, ERROR_REPLY).await?;
            Ok(())
        }
    }
}

/// Inline button taps.
///
/// The first screen replaces the tapped message unless it needs more than
/// one message; a toast becomes the callback answer.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    config: Arc<Config>,
    engine: Arc<Engine>,
) -> ResponseResult<()> {
    let Some(actor) = actor(&config, q.from.id.0) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let Some(action) = q.data.as_deref().and_then(Action::parse) else {
        tracing::warn!(data = ?q.data, "unknown callback data");
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let outputs = match engine.handle(&actor, Event::Button(action)).await {
        Ok(outputs) => outputs,
        Err(e) => {
            tracing::error!(user = actor.user_id, error = %e, "callback handling failed");
            bot.answer_callback_query(q.id.clone())
                .text(ERROR_REPLY)
                .await?;
            return Ok(());
        }
    };

    let (toasts, outputs): (Vec<Output>, Vec<Output>) = outputs
        .into_iter()
        .partition(|o| matches!(o, Output::Toast(_)));
    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(Output::Toast(toast)) = toasts.first() {
        answer = answer.text(render::toast(*toast));
    }
    answer.await?;

    let Some(message) = q.regular_message() else {
        tracing::warn!("Callback query without regular message, skipping edit");
        return Ok(());
    };
    deliver(&bot, &config, message.chat.id, outputs, Some(message.id), None).await
}

/// Present engine outputs in order.
///
/// `edit` is the message the first screen replaces; `input` is the user's
/// message, deleted on [`Output::DiscardInput`].
pub async fn deliver(
    bot: &Bot,
    config: &Config,
    chat: ChatId,
    outputs: Vec<Output>,
    mut edit: Option<MessageId>,
    input: Option<MessageId>,
) -> ResponseResult<()> {
    for output in outputs {
        match output {
            Output::Screen(screen) => {
                let rendered = render::screen(&screen, &config.conference);
                let chunks = render::chunk_text(&rendered.text);
                if let Some(message) = edit.take()
                    && chunks.len() == 1
                    && edit_message(bot, chat, message, &rendered).await
                {
                    continue;
                }
                send(bot, chat, chunks, rendered.keyboard).await?;
            }
            Output::Toast(toast) => {
                bot.send_message(chat, render::toast(toast)).await?;
            }
            Output::DiscardInput => {
                if let Some(message) = input {
                    bot.delete_message(chat, message).await.ok();
                }
            }
            Output::Document(file) => send_export(bot, config, chat, file).await?,
        }
    }
    Ok(())
}

/// Returns `false` when Telegram refused the edit and a new message is needed.
async fn edit_message(
    bot: &Bot,
    chat: ChatId,
    message: MessageId,
    rendered: &render::Rendered,
) -> bool {
    let mut request = bot.edit_message_text(chat, message, rendered.text.clone());
    if let Some(keyboard) = rendered.keyboard.clone() {
        request = request.reply_markup(keyboard);
    }
    match request.await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Failed to edit callback message: {}", e);
            false
        }
    }
}

/// Send a possibly split reply. The keyboard goes under the last chunk.
async fn send(
    bot: &Bot,
    chat: ChatId,
    chunks: Vec<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> ResponseResult<()> {
    let last = chunks.len().saturating_sub(1);
    for (i, chunk) in chunks.into_iter().enumerate() {
        let mut request = bot.send_message(chat, chunk);
        if i == last
            && let Some(keyboard) = keyboard.clone()
        {
            request = request.reply_markup(keyboard);
        }
        request.await?;
    }
    Ok(())
}

async fn send_export(
    bot: &Bot,
    config: &Config,
    chat: ChatId,
    file: ExportFile,
) -> ResponseResult<()> {
    let document = InputFile::memory(file.bytes).file_name(file.file_name);
    let sent = bot
        .send_document(chat, document)
        .caption(format!("{} evaluations", file.evaluations))
        .await?;
    delete_later(bot.clone(), chat, sent.id, config.notifications.export_ttl());
    Ok(())
}

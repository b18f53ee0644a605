//! Proactive delivery over Telegram.

use std::time::Duration;

use async_trait::async_trait;
use podium_core::config::NotificationConfig;
use podium_core::{Notification, Notifier, NotifyError, UserId};
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::MessageId;

use crate::render;

/// Sends notifications as chat messages that delete themselves.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    reminder_ttl: Duration,
    broadcast_ttl: Duration,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, config: &NotificationConfig) -> Self {
        Self {
            bot,
            reminder_ttl: config.reminder_ttl(),
            broadcast_ttl: config.broadcast_ttl(),
        }
    }

    fn ttl(&self, notification: &Notification) -> Duration {
        if notification.is_broadcast() {
            self.broadcast_ttl
        } else {
            self.reminder_ttl
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, user: UserId, notification: &Notification) -> Result<(), NotifyError> {
        let rendered = render::notification(notification);
        let chat = ChatId(user);
        let ttl = self.ttl(notification);

        let chunks = render::chunk_text(&rendered.text);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut request = self.bot.send_message(chat, chunk);
            if i == last
                && let Some(keyboard) = rendered.keyboard.clone()
            {
                request = request.reply_markup(keyboard);
            }
            let sent = request.await.map_err(|e| NotifyError::Delivery {
                user,
                reason: e.to_string(),
            })?;
            delete_later(self.bot.clone(), chat, sent.id, ttl);
        }
        Ok(())
    }
}

/// Delete `message` after `ttl` without blocking the caller.
pub fn delete_later(bot: Bot, chat: ChatId, message: MessageId, ttl: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if let Err(e) = bot.delete_message(chat, message).await {
            tracing::debug!(chat = chat.0, error = %e, "expired message already gone");
        }
    });
}

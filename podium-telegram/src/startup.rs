//! Startup helpers: bot token resolution and actor construction.

use podium_core::{Actor, Config};

#[cfg(test)]
mod tests;

/// Resolve the bot token with the following priority:
///
/// 1. `TELEGRAM_BOT_TOKEN` environment variable (if set and non-empty).
/// 2. `telegram.token` in `config.toml`.
///
/// The token is **never** passed to any tracing macro.
///
/// # Errors
///
/// Returns an error if neither source provides a token.
pub fn resolve_bot_token(config: &Config) -> anyhow::Result<String> {
    if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN")
        && !token.is_empty()
    {
        return Ok(token);
    }
    config
        .telegram
        .as_ref()
        .and_then(|t| t.token.clone())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Bot token required: set TELEGRAM_BOT_TOKEN env var or telegram.token in config"
            )
        })
}

/// Build the actor for a Telegram user id.
///
/// Returns `None` for ids that do not fit the stored user id type.
pub fn actor(config: &Config, telegram_id: u64) -> Option<Actor> {
    let user_id = i64::try_from(telegram_id).ok()?;
    Some(Actor::new(user_id, config.is_admin(user_id)))
}

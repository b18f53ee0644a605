//! Podium Telegram Bot: the conference assistant over Telegram.
//!
//! Wires the Telegram Bot API to `podium-core`: updates become engine
//! events, engine outputs become messages, and the notification scheduler
//! runs alongside the dispatcher.

mod commands;
mod handlers;
mod notifier;
mod render;
mod startup;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use notifier::TelegramNotifier;
use podium_core::config::Rotation;
use podium_core::{
    CatalogStore, Clock, Config, Engine, NotificationPolicy, NotificationScheduler, Notifier,
    StateStore, SystemClock, create_storage,
};
use startup::resolve_bot_token;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio::sync::watch;
use tracing_subscriber::prelude::*;

/// Podium Telegram Bot: conference schedule, reminders and evaluations
#[derive(Parser)]
#[command(name = "podium-telegram", version)]
struct Args {
    /// Path to a custom config file (overrides default search locations)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

/// Default tracing directives enabling info-level logs for this crate and podium-core.
const DEFAULT_DIRECTIVES: &[&str] = &["podium_telegram=info", "podium_core=info"];

/// Build the default `EnvFilter`: RUST_LOG (if set) plus our default directives.
fn default_env_filter() -> anyhow::Result<tracing_subscriber::EnvFilter> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Initialize the tracing subscriber.
///
/// With a `[logging]` section, logs go to stdout and to a rolling file;
/// without one, to stdout only.
///
/// Returns the non-blocking writer guard that must be held for the process lifetime.
fn init_tracing(
    config: &Config,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(ref lc) = config.logging else {
        tracing_subscriber::fmt()
            .with_env_filter(default_env_filter()?)
            .init();
        return Ok(None);
    };

    if let Err(e) = std::fs::create_dir_all(&lc.directory) {
        eprintln!(
            "Warning: Failed to create log directory '{}': {}. Falling back to stdout-only.",
            lc.directory, e
        );
        tracing_subscriber::fmt()
            .with_env_filter(default_env_filter()?)
            .init();
        return Ok(None);
    }

    let rotation = match lc.rotation {
        Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
        Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
        Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
    };

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix("podium-telegram")
        .filename_suffix("log")
        .max_log_files(lc.max_files)
        .build(&lc.directory)
        .context("Failed to create rolling file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(default_env_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Tracing init depends on config, so load it first.
    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    let _guard = init_tracing(&config)?;

    tracing::info!(conference = %config.conference.name, "Starting Podium Telegram Bot");

    let token = resolve_bot_token(&config).context("Failed to obtain bot token")?;
    let bot = Bot::new(token);

    let db_url = config
        .storage
        .as_ref()
        .and_then(|s| s.database_url.as_deref());
    let store = Arc::new(
        create_storage(db_url)
            .await
            .context("Failed to initialize storage")?,
    );
    let catalog: Arc<dyn CatalogStore> = store.clone();
    let states: Arc<dyn StateStore> = store;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.conference.offset()));
    let notifier: Arc<dyn Notifier> =
        Arc::new(TelegramNotifier::new(bot.clone(), &config.notifications));

    let engine = Arc::new(Engine::new(
        Arc::clone(&catalog),
        states,
        Arc::clone(&notifier),
        Arc::clone(&clock),
        config.conference.window(),
    ));

    if config.telegram.as_ref().is_none_or(|t| t.admins.is_empty()) {
        tracing::warn!("No admins configured: nobody can upload the schedule");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = NotificationScheduler::new(
        catalog,
        notifier,
        clock,
        NotificationPolicy::from_config(&config),
    );
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let config = Arc::new(config);

    // Required for filter_command parsing.
    let me = bot.get_me().await.context("Failed to fetch bot identity")?;

    // Autocomplete only; non-fatal on failure.
    if let Err(e) = bot.set_my_commands(commands::Command::bot_commands()).await {
        tracing::warn!("Failed to register bot commands: {}", e);
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<commands::Command>()
                        .endpoint(commands::handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| msg.document().is_some())
                        .endpoint(handlers::handle_document),
                )
                .branch(dptree::entry().endpoint(handlers::handle_message)),
        )
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

    tracing::info!("Dispatcher ready, polling for updates");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![me, Arc::clone(&config), Arc::clone(&engine)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Dispatcher stopped, shutting down");
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Notification scheduler already stopped");
    }
    if let Err(e) = scheduler_task.await {
        tracing::warn!(error = %e, "Notification scheduler task failed");
    }

    Ok(())
}

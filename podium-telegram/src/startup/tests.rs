use std::sync::Mutex;

use chrono::NaiveDate;
use podium_core::config::{ConferenceConfig, NotificationConfig, TelegramConfig};

use super::*;

/// Guards tests that mutate environment variables to prevent race conditions.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn config(telegram: Option<TelegramConfig>) -> Config {
    let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    Config {
        conference: ConferenceConfig {
            name: "RustConf".to_string(),
            url: None,
            starts_at: day.and_hms_opt(9, 0, 0).unwrap(),
            ends_at: day.and_hms_opt(19, 0, 0).unwrap(),
            utc_offset_hours: 3,
        },
        telegram,
        storage: None,
        notifications: NotificationConfig::default(),
        logging: None,
    }
}

fn with_token(token: &str) -> Config {
    config(Some(TelegramConfig {
        token: Some(token.to_string()),
        ..TelegramConfig::default()
    }))
}

// Token resolution tests

#[test]
fn test_resolve_token_env_var() {
    let _guard = ENV_MUTEX.lock().unwrap();
    // SAFETY: guarded by mutex; single-threaded section.
    unsafe { std::env::set_var("TELEGRAM_BOT_TOKEN", "env-token-value") };

    let result = resolve_bot_token(&with_token("config-token"));
    assert_eq!(result.unwrap(), "env-token-value");

    // SAFETY: guarded by mutex.
    unsafe { std::env::remove_var("TELEGRAM_BOT_TOKEN") };
}

#[test]
fn test_resolve_token_config() {
    let _guard = ENV_MUTEX.lock().unwrap();
    // SAFETY: guarded by mutex.
    unsafe { std::env::remove_var("TELEGRAM_BOT_TOKEN") };

    let result = resolve_bot_token(&with_token("config-token"));
    assert_eq!(result.unwrap(), "config-token");
}

#[test]
fn test_resolve_token_none() {
    let _guard = ENV_MUTEX.lock().unwrap();
    // SAFETY: guarded by mutex.
    unsafe { std::env::remove_var("TELEGRAM_BOT_TOKEN") };

    let result = resolve_bot_token(&config(None));
    assert!(result.is_err());
    let msg = result.unwrap_err().to_string();
    assert!(msg.contains("TELEGRAM_BOT_TOKEN"));
}

#[test]
fn test_resolve_token_empty_sources() {
    let _guard = ENV_MUTEX.lock().unwrap();
    // SAFETY: guarded by mutex.
    unsafe { std::env::set_var("TELEGRAM_BOT_TOKEN", "") };

    assert_eq!(
        resolve_bot_token(&with_token("fallback-config-token")).unwrap(),
        "fallback-config-token"
    );
    assert!(resolve_bot_token(&with_token("")).is_err());

    // SAFETY: guarded by mutex.
    unsafe { std::env::remove_var("TELEGRAM_BOT_TOKEN") };
}

// Actor tests

#[test]
fn test_actor_admin_flag_from_config() {
    let config = config(Some(TelegramConfig {
        token: None,
        admins: vec![42],
    }));
    assert_eq!(actor(&config, 42), Some(Actor::new(42, true)));
    assert_eq!(actor(&config, 7), Some(Actor::new(7, false)));
}

#[test]
fn test_actor_rejects_out_of_range_id() {
    assert_eq!(actor(&config(None), u64::MAX), None);
}

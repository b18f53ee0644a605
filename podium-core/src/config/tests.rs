use std::io::Write;

use chrono::NaiveDate;

use super::*;

const MINIMAL: &str = r#"
[conference]
name = "RustConf"
starts_at = "01/06/2024 09:00:00"
ends_at = "02/06/2024 19:00:00"
"#;

fn write_temp(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "{}", content).unwrap();
    path
}

#[test]
fn test_parse_minimal_toml() {
    let config: Config = toml::from_str(MINIMAL).unwrap();
    assert_eq!(config.conference.name, "RustConf");
    assert_eq!(config.conference.url, None);
    assert_eq!(
        config.conference.starts_at,
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    );
    assert_eq!(config.conference.utc_offset_hours, 3);
    assert_eq!(config.telegram, None);
    assert_eq!(config.storage, None);
    assert_eq!(config.logging, None);
    assert_eq!(config.notifications, NotificationConfig::default());
}

#[test]
fn test_notification_defaults() {
    let n = NotificationConfig::default();
    assert_eq!(n.tick(), Duration::from_secs(15));
    assert_eq!(n.lead_minutes, 10);
    assert_eq!(n.day_grace_minutes, 60);
    assert_eq!(n.conference_grace_hours, 48);
    assert_eq!(n.reminder_ttl(), Duration::from_secs(7));
    assert_eq!(n.broadcast_ttl(), Duration::from_secs(3));
    assert_eq!(n.export_ttl(), Duration::from_secs(60));
}

#[test]
fn test_parse_full_toml() {
    let toml = r#"
[conference]
name = "RustConf"
url = "https://rustconf.example"
starts_at = "01/06/2024 09:00:00"
ends_at = "02/06/2024 19:00:00"
utc_offset_hours = 0

[telegram]
token = "123:abc"
admins = [42, 7]

[storage]
database_url = "sqlite:/tmp/podium.db"

[notifications]
tick_secs = 30
lead_minutes = 5

[logging]
directory = "/var/log/podium"
max_files = 3
rotation = "hourly"
"#;
    let config: Config = toml::from_str(toml).unwrap();
    assert_eq!(
        config.conference.url.as_deref(),
        Some("https://rustconf.example")
    );
    assert_eq!(config.conference.offset(), FixedOffset::east_opt(0).unwrap());

    let telegram = config.telegram.as_ref().unwrap();
    assert_eq!(telegram.token.as_deref(), Some("123:abc"));
    assert_eq!(telegram.admins, vec![42, 7]);
    assert!(config.is_admin(42));
    assert!(!config.is_admin(43));

    assert_eq!(
        config.storage.unwrap().database_url.as_deref(),
        Some("sqlite:/tmp/podium.db")
    );
    assert_eq!(config.notifications.tick_secs, 30);
    assert_eq!(config.notifications.lead_minutes, 5);
    assert_eq!(config.notifications.reminder_ttl_secs, 7);

    let logging = config.logging.unwrap();
    assert_eq!(logging.directory, "/var/log/podium");
    assert_eq!(logging.max_files, 3);
    assert_eq!(logging.rotation, Rotation::Hourly);
}

#[test]
fn test_logging_section_defaults() {
    let toml = format!("{MINIMAL}\n[logging]\n");
    let config: Config = toml::from_str(&toml).unwrap();
    assert_eq!(config.logging, Some(LoggingConfig::default()));
}

#[test]
fn test_missing_conference_is_rejected() {
    let result: Result<Config, _> = toml::from_str("[telegram]\ntoken = \"x\"\n");
    assert!(result.is_err());
}

#[test]
fn test_bad_timestamp_is_rejected() {
    let toml = MINIMAL.replace("01/06/2024 09:00:00", "2024-06-01T09:00:00");
    let result: Result<Config, _> = toml::from_str(&toml);
    let err = result.unwrap_err().to_string();
    assert!(err.contains("2024-06-01T09:00:00"), "{err}");
}

#[test]
fn test_no_admins_means_nobody_is_admin() {
    let config: Config = toml::from_str(MINIMAL).unwrap();
    assert!(!config.is_admin(1));
}

#[test]
fn test_validate_rejects_inverted_window() {
    let toml = MINIMAL
        .replace("01/06/2024 09:00:00", "03/06/2024 09:00:00");
    let config: Config = toml::from_str(&toml).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_validate_rejects_offset_out_of_range() {
    let toml = format!("{}utc_offset_hours = 30\n", MINIMAL.trim_start());
    let config: Config = toml::from_str(&toml).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

fn with_notifications(section: &str) -> Config {
    let toml = format!("{MINIMAL}\n[notifications]\n{section}\n");
    toml::from_str(&toml).unwrap()
}

/// Whether validation fails and names `field`.
fn rejects(config: &Config, field: &str) -> bool {
    matches!(config.validate(), Err(ConfigError::Invalid(ref m)) if m.contains(field))
}

#[test]
fn test_validate_reminder_periods_bounds() {
    for field in ["lead_minutes", "day_grace_minutes"] {
        for bad in [0, -5, MINUTES_PER_YEAR + 1] {
            let config = with_notifications(&format!("{field} = {bad}"));
            assert!(rejects(&config, field), "{field} = {bad}");
        }
        let config = with_notifications(&format!("{field} = {MINUTES_PER_YEAR}"));
        assert!(config.validate().is_ok(), "{field} at the upper bound");
    }

    for bad in [0, -1, HOURS_PER_YEAR + 1, 3_000_000_000] {
        let config = with_notifications(&format!("conference_grace_hours = {bad}"));
        assert!(
            rejects(&config, "conference_grace_hours"),
            "conference_grace_hours = {bad}"
        );
    }
    let config = with_notifications(&format!("conference_grace_hours = {HOURS_PER_YEAR}"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_zero_tick() {
    let config = with_notifications("tick_secs = 0");
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_from_path() {
    let path = write_temp("podium_test_config.toml", MINIMAL);
    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.conference.name, "RustConf");
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_load_prefers_explicit_path() {
    let path = write_temp(
        "podium_explicit_config.toml",
        &MINIMAL.replace("RustConf", "Explicit"),
    );
    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.conference.name, "Explicit");
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_load_from_validates() {
    let path = write_temp(
        "podium_inverted_config.toml",
        &MINIMAL.replace("01/06/2024 09:00:00", "03/06/2024 09:00:00"),
    );
    let result = Config::load_from(&path);
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_parse_invalid_toml() {
    let path = write_temp("podium_invalid_config.toml", "invalid = [");
    let result = Config::load_from(&path);
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_load_from_nonexistent_file() {
    let result = Config::load_from("/nonexistent/path/config.toml");
    assert!(matches!(result, Err(ConfigError::IoError { .. })));
}

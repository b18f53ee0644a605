use chrono::{NaiveDate, NaiveDateTime};
use podium_core::engine::{EvaluationEntry, ReportRow};
use podium_core::{Action, Evaluation, Score};
use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

use super::*;

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn conference() -> ConferenceConfig {
    ConferenceConfig {
        name: "RustConf".to_string(),
        url: Some("https://rustconf.example".to_string()),
        starts_at: at(9, 0),
        ends_at: at(19, 0),
        utc_offset_hours: 3,
    }
}

fn report(url: &str, title: &str) -> Report {
    Report {
        url: url.to_string(),
        title: title.to_string(),
        speakers: "Ann Lee".to_string(),
        start_time: at(10, 0),
        duration_minutes: 30,
    }
}

/// Decoded callback actions of every button, row by row.
fn actions(keyboard: &InlineKeyboardMarkup) -> Vec<Vec<Option<Action>>> {
    keyboard
        .inline_keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| match &b.kind {
                    InlineKeyboardButtonKind::CallbackData(data) => Action::parse(data),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_menu_admin_buttons_only_for_admins() {
    let menu = |is_admin| Screen::Menu {
        greeting: Greeting::Returned,
        identification: "ann".to_string(),
        is_admin,
    };

    let user = screen(&menu(false), &conference());
    let flat: Vec<_> = actions(user.keyboard.as_ref().unwrap()).concat();
    assert!(!flat.contains(&Some(Action::UploadSchedule)));
    assert!(user.text.contains("ann"));

    let admin = screen(&menu(true), &conference());
    let flat: Vec<_> = actions(admin.keyboard.as_ref().unwrap()).concat();
    assert!(flat.contains(&Some(Action::UploadSchedule)));
    assert!(flat.contains(&Some(Action::ExportEvaluations)));
}

#[test]
fn test_report_rows_toggle_and_evaluate() {
    let rows = vec![
        ReportRow {
            position: 1,
            report: report("https://conf/a", "Started"),
            favorite: true,
            open: true,
        },
        ReportRow {
            position: 2,
            report: report("https://conf/b", "Later"),
            favorite: false,
            open: false,
        },
    ];
    let rendered = screen(
        &Screen::Reports {
            rows,
            has_evaluations: true,
        },
        &conference(),
    );
    let grid = actions(rendered.keyboard.as_ref().unwrap());

    assert_eq!(
        grid[0],
        vec![
            Some(Action::RemoveFavorite("https://conf/a".into())),
            Some(Action::Evaluate("https://conf/a".into())),
        ]
    );
    assert_eq!(
        grid[1],
        vec![
            Some(Action::AddFavorite("https://conf/b".into())),
            Some(Action::NotYetAvailable),
        ]
    );
    assert_eq!(grid[2], vec![Some(Action::MyEvaluations)]);
    assert_eq!(grid[3], vec![Some(Action::Menu)]);
    assert!(rendered.text.contains("1. 01.06 10:00 (30 min) 🌟 Started"));
}

#[test]
fn test_empty_schedule_text() {
    let rendered = screen(
        &Screen::Reports {
            rows: vec![],
            has_evaluations: false,
        },
        &conference(),
    );
    assert_eq!(rendered.text, "The schedule has not been published yet.");
    assert_eq!(actions(rendered.keyboard.as_ref().unwrap()), vec![vec![Some(Action::Menu)]]);
}

#[test]
fn test_large_schedule_is_sent_in_several_messages() {
    let rows: Vec<ReportRow> = (1..=150)
        .map(|i| ReportRow {
            position: i,
            report: report(
                &format!("https://conf/{i}"),
                "A fairly long report title about async Rust in production",
            ),
            favorite: false,
            open: true,
        })
        .collect();
    let rendered = screen(
        &Screen::Reports {
            rows,
            has_evaluations: false,
        },
        &conference(),
    );

    let chunks = chunk_text(&rendered.text);
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.len() <= 4096));
    assert!(chunks[0].starts_with("Reports"));
    assert!(chunks.last().unwrap().contains("150. "));
}

#[test]
fn test_content_scale_has_five_scores_and_back() {
    let rendered = screen(&Screen::ContentScale, &conference());
    let grid = actions(rendered.keyboard.as_ref().unwrap());
    let expected: Vec<_> = Score::all().map(|s| Some(Action::Content(s))).collect();
    assert_eq!(grid[0], expected);
    assert_eq!(grid[1], vec![Some(Action::Back)]);
}

#[test]
fn test_my_evaluations_lists_scores_and_comment() {
    let s = |v| Score::new(v).unwrap();
    let entries = vec![EvaluationEntry {
        position: 1,
        report: report("https://conf/a", "Rust"),
        evaluation: Evaluation::rated(7, "https://conf/a", s(4), s(5), "great"),
    }];
    let rendered = screen(&Screen::MyEvaluations { entries }, &conference());
    assert!(rendered.text.contains("Ann Lee - Rust"));
    assert!(rendered.text.contains("content: 4, delivery: 5"));
    assert!(rendered.text.contains("\"great\""));

    let grid = actions(rendered.keyboard.as_ref().unwrap());
    assert_eq!(
        grid[0],
        vec![
            Some(Action::EditEvaluation("https://conf/a".into())),
            Some(Action::DeleteEvaluation("https://conf/a".into())),
        ]
    );
}

#[test]
fn test_update_outcome_texts_differ() {
    let changed = screen(&Screen::EvaluationUpdated { changed: true }, &conference());
    let same = screen(&Screen::EvaluationUpdated { changed: false }, &conference());
    assert_ne!(changed.text, same.text);
    assert!(same.text.starts_with("Nothing changed"));
}

#[test]
fn test_conference_info_includes_site() {
    let rendered = screen(&Screen::ConferenceInfo, &conference());
    assert!(rendered.text.starts_with("RustConf"));
    assert!(rendered.text.contains("01/06/2024 09:00:00"));
    assert!(rendered.text.contains("https://rustconf.example"));
}

#[test]
fn test_rate_reminder_carries_evaluate_button() {
    let rendered = notification(&Notification::RateReport {
        report: report("https://conf/a", "Rust"),
    });
    assert_eq!(
        actions(rendered.keyboard.as_ref().unwrap()),
        vec![vec![Some(Action::Evaluate("https://conf/a".into()))]]
    );
}

#[test]
fn test_day_digest_lists_reports() {
    let rendered = notification(&Notification::DayDigest {
        day: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        reports: vec![report("a", "One"), report("b", "Two")],
    });
    assert!(rendered.text.contains("01.06.2024"));
    assert!(rendered.text.contains("• Ann Lee - One\n• Ann Lee - Two"));
    assert!(rendered.keyboard.is_none());
}

#[test]
fn test_schedule_notices() {
    let updated = notification(&Notification::ScheduleChanged(ScheduleNotice::Updated));
    let removed = notification(&Notification::ScheduleChanged(ScheduleNotice::Removed));
    assert_ne!(updated.text, removed.text);
}

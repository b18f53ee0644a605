//! Inline keyboards. Button payloads are [`Action::payload`] strings.

use podium_core::engine::{EvaluationEntry, ReportRow};
use podium_core::text::truncate;
use podium_core::{Action, Score};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Telegram rejects callback data longer than this many bytes.
const CALLBACK_DATA_LIMIT: usize = 64;

/// Maximum characters of a report title on a button.
const BUTTON_TITLE_MAX_CHARS: usize = 24;

fn button(label: impl Into<String>, action: Action) -> InlineKeyboardButton {
    let data = action.payload();
    if data.len() > CALLBACK_DATA_LIMIT {
        tracing::warn!(bytes = data.len(), "callback data exceeds Telegram limit");
    }
    InlineKeyboardButton::callback(label, data)
}

fn menu_row() -> Vec<InlineKeyboardButton> {
    vec![button("🏠 Main menu", Action::Menu)]
}

pub(super) fn back() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![menu_row()])
}

pub(super) fn menu(is_admin: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![button("ℹ️ Conference", Action::ConferenceInfo)],
        vec![button("📋 Reports", Action::ViewReports)],
        vec![button("✏️ Edit identification", Action::EditIdentity)],
    ];
    if is_admin {
        rows.push(vec![
            button("📤 Upload schedule", Action::UploadSchedule),
            button("📥 Download evaluations", Action::ExportEvaluations),
        ]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// One row per report: favorite toggle then evaluate.
pub(super) fn reports(rows: &[ReportRow], has_evaluations: bool) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = rows
        .iter()
        .map(|row| {
            let url = row.report.url.clone();
            let title = truncate(&row.report.title, BUTTON_TITLE_MAX_CHARS);
            let favorite = if row.favorite {
                button(format!("🌟 {}", row.position), Action::RemoveFavorite(url.clone()))
            } else {
                button(format!("⭐ {}", row.position), Action::AddFavorite(url.clone()))
            };
            let evaluate = if row.open {
                button(format!("🏆 {title}"), Action::Evaluate(url))
            } else {
                button(format!("⛔ {title}"), Action::NotYetAvailable)
            };
            vec![favorite, evaluate]
        })
        .collect();
    if has_evaluations {
        keyboard.push(vec![button("🗂 My evaluations", Action::MyEvaluations)]);
    }
    keyboard.push(menu_row());
    InlineKeyboardMarkup::new(keyboard)
}

pub(super) fn rate_report() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("Rate", Action::BeginRating)],
        vec![
            button("I did not attend", Action::NotAttended),
            button("I prefer not to rate", Action::Decline),
        ],
        menu_row(),
    ])
}

fn scale(action: fn(Score) -> Action, back: Action) -> InlineKeyboardMarkup {
    let scores: Vec<InlineKeyboardButton> = Score::all()
        .map(|score| button(score.to_string(), action(score)))
        .collect();
    InlineKeyboardMarkup::new(vec![scores, vec![button("⬅️ Back", back)]])
}

pub(super) fn content_scale() -> InlineKeyboardMarkup {
    scale(Action::Content, Action::Back)
}

pub(super) fn performance_scale() -> InlineKeyboardMarkup {
    scale(Action::Performance, Action::Back)
}

pub(super) fn comment() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("Skip", Action::SkipComment)],
        vec![button("⬅️ Back", Action::Back)],
    ])
}

pub(super) fn update_content_scale() -> InlineKeyboardMarkup {
    scale(Action::UpdateContent, Action::Back)
}

pub(super) fn update_performance_scale() -> InlineKeyboardMarkup {
    scale(Action::UpdatePerformance, Action::Back)
}

pub(super) fn update_comment() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("No comment", Action::UpdateSkipComment)],
        vec![button("⬅️ Back", Action::Back)],
    ])
}

pub(super) fn after_evaluation() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📋 Reports", Action::ViewReports)],
        menu_row(),
    ])
}

pub(super) fn after_update() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🗂 My evaluations", Action::MyEvaluations)],
        menu_row(),
    ])
}

pub(super) fn my_evaluations(entries: &[EvaluationEntry]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = entries
        .iter()
        .map(|entry| {
            let url = &entry.report.url;
            vec![
                button(
                    format!("✏️ {}", entry.position),
                    Action::EditEvaluation(url.clone()),
                ),
                button(
                    format!("🗑 {}", entry.position),
                    Action::DeleteEvaluation(url.clone()),
                ),
            ]
        })
        .collect();
    rows.push(vec![button("📋 Reports", Action::ViewReports)]);
    rows.push(menu_row());
    InlineKeyboardMarkup::new(rows)
}

/// Single evaluate button attached to a rate reminder.
pub(super) fn evaluate(url: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "🏆 Evaluate",
        Action::Evaluate(url.to_string()),
    )]])
}

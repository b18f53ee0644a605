//! Text and keyboards for engine screens, toasts and notifications.
//!
//! Everything here is pure: the handlers decide where a [`Rendered`]
//! message goes (new message, edit, or notification).

mod chunk;
mod keyboard;

use std::fmt::Write as _;

use podium_core::config::ConferenceConfig;
use podium_core::engine::{EvaluationEntry, ReportRow};
use podium_core::model::TIMESTAMP_FORMAT;
use podium_core::wizard::{Greeting, Toast};
use podium_core::{ContentScore, Notification, Report, ScheduleNotice, Screen, SyncOutcome};
use teloxide::types::InlineKeyboardMarkup;

pub use chunk::chunk_text;

#[cfg(test)]
mod tests;

/// Format of start times in report lists.
const LIST_TIME_FORMAT: &str = "%d.%m %H:%M";

/// Format of a calendar day in digests.
const DAY_FORMAT: &str = "%d.%m.%Y";

/// A message ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Rendered {
    fn new(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }
}

pub fn screen(screen: &Screen, conference: &ConferenceConfig) -> Rendered {
    match screen {
        Screen::AskIdentity => Rendered::plain(format!(
            "Welcome to {}!\n\nPlease send your identification: \
             ticket number, e-mail or full name.",
            conference.name
        )),
        Screen::IdentityRejected => Rendered::plain(
            "The identification cannot be empty or start with '/'. Please send it again.",
        ),
        Screen::Menu {
            greeting,
            identification,
            is_admin,
        } => Rendered::new(
            format!(
                "{}\n\nYou are registered as: {identification}",
                greeting_text(*greeting)
            ),
            keyboard::menu(*is_admin),
        ),
        Screen::ConferenceInfo => Rendered::new(conference_info(conference), keyboard::back()),
        Screen::Reports {
            rows,
            has_evaluations,
        } => Rendered::new(report_list(rows), keyboard::reports(rows, *has_evaluations)),
        Screen::EditIdentity { current } => Rendered::new(
            format!("Current identification: {current}\n\nSend a new one."),
            keyboard::back(),
        ),
        Screen::IdentityChanged { identification } => Rendered::new(
            format!("Identification changed to: {identification}"),
            keyboard::back(),
        ),
        Screen::AwaitUpload => Rendered::new(
            "Send the schedule as a .csv file. Each line holds: start time \
             (dd/mm/yyyy hh:mm:ss), duration in minutes, title, speakers, URL.",
            keyboard::back(),
        ),
        Screen::ScheduleImported { reports, outcome } => Rendered::new(
            format!(
                "Schedule uploaded: {reports} reports.\n{}",
                import_summary(outcome)
            ),
            keyboard::back(),
        ),
        Screen::UploadRejected(e) => Rendered::new(
            format!("The schedule was not accepted: {e}\n\nFix the file and send it again."),
            keyboard::back(),
        ),
        Screen::RateReport { prompt } => {
            Rendered::new(format!("Evaluate the report\n{prompt}"), keyboard::rate_report())
        }
        Screen::ContentScale => Rendered::new(
            "How would you rate the content? 1 is the lowest, 5 the highest.",
            keyboard::content_scale(),
        ),
        Screen::PerformanceScale => Rendered::new(
            "How would you rate the delivery?",
            keyboard::performance_scale(),
        ),
        Screen::CommentPrompt => Rendered::new(
            "Send a comment for the speakers, or skip this step.",
            keyboard::comment(),
        ),
        Screen::EvaluationSaved => Rendered::new(
            "Thank you, your evaluation is saved.",
            keyboard::after_evaluation(),
        ),
        Screen::EvaluationSkipped(marker) => Rendered::new(
            match marker {
                ContentScore::NotAttended => "Noted: you did not attend this report.",
                ContentScore::Declined => "Noted: you chose not to evaluate this report.",
                ContentScore::Rated(_) => "Thank you, your evaluation is saved.",
            },
            keyboard::after_evaluation(),
        ),
        Screen::MyEvaluations { entries } => {
            Rendered::new(evaluation_list(entries), keyboard::my_evaluations(entries))
        }
        Screen::UpdateContentScale { prompt } => Rendered::new(
            format!("Editing your evaluation\n{prompt}\n\nHow would you rate the content?"),
            keyboard::update_content_scale(),
        ),
        Screen::UpdatePerformanceScale => Rendered::new(
            "How would you rate the delivery?",
            keyboard::update_performance_scale(),
        ),
        Screen::UpdateCommentPrompt => Rendered::new(
            "Send a new comment, or keep it empty.",
            keyboard::update_comment(),
        ),
        Screen::EvaluationUpdated { changed } => Rendered::new(
            if *changed {
                "Your evaluation is updated."
            } else {
                "Nothing changed: the evaluation is the same as before."
            },
            keyboard::after_update(),
        ),
        Screen::EvaluationDeleted { existed } => Rendered::new(
            if *existed {
                "Your evaluation is deleted."
            } else {
                "There was no evaluation to delete."
            },
            keyboard::after_update(),
        ),
    }
}

pub fn toast(toast: Toast) -> &'static str {
    match toast {
        Toast::NotYetAvailable => "The report has not started yet",
        Toast::ReportUnavailable => "The report is no longer in the schedule",
        Toast::AdminOnly => "Only organizers can do this",
        Toast::FavoriteAdded => "Added to favorites",
        Toast::FavoriteRemoved => "Removed from favorites",
        Toast::NothingToEdit => "You have no evaluation of this report to edit",
    }
}

pub fn notification(notification: &Notification) -> Rendered {
    match notification {
        Notification::StartingSoon { report } => Rendered::plain(format!(
            "Starting at {}: \"{}\" by {}",
            report.start_time.format("%H:%M"),
            report.title,
            report.speakers
        )),
        Notification::RateReport { report } => Rendered::new(
            format!(
                "\"{}\" has ended. Please evaluate it while it is fresh.",
                report.title
            ),
            keyboard::evaluate(&report.url),
        ),
        Notification::DayDigest { day, reports } => Rendered::plain(format!(
            "The reports of {} are over. You have not evaluated:\n{}\n\
             Open the report list to do it.",
            day.format(DAY_FORMAT),
            titles(reports)
        )),
        Notification::ConferenceDigest { reports } => Rendered::plain(format!(
            "The conference is over, thank you for coming! You have not evaluated:\n{}",
            titles(reports)
        )),
        Notification::ScheduleChanged(ScheduleNotice::Updated) => {
            Rendered::plain("The schedule has been updated.")
        }
        Notification::ScheduleChanged(ScheduleNotice::Removed) => {
            Rendered::plain("Some reports have been removed from the schedule.")
        }
    }
}

fn greeting_text(greeting: Greeting) -> &'static str {
    match greeting {
        Greeting::Registered => "Thank you, you are registered.",
        Greeting::WelcomeBack => "Welcome back!",
        Greeting::AfterUpload => "Schedule upload cancelled.",
        Greeting::AfterIdentityEdit => "Identification editing finished.",
        Greeting::Returned => "Main menu",
        Greeting::SessionReset => "That step is no longer active. Here is the main menu.",
    }
}

fn conference_info(conference: &ConferenceConfig) -> String {
    let mut text = format!(
        "{}\n\nStarts: {}\nEnds: {}",
        conference.name,
        conference.starts_at.format(TIMESTAMP_FORMAT),
        conference.ends_at.format(TIMESTAMP_FORMAT)
    );
    if let Some(url) = &conference.url {
        let _ = write!(text, "\nSite: {url}");
    }
    text
}

fn import_summary(outcome: &SyncOutcome) -> &'static str {
    match outcome.notice() {
        Some(ScheduleNotice::Removed) => "Participants were told that reports were removed.",
        Some(ScheduleNotice::Updated) => "Participants were told that the schedule changed.",
        None => "Nothing changed.",
    }
}

fn report_list(rows: &[ReportRow]) -> String {
    if rows.is_empty() {
        return "The schedule has not been published yet.".to_string();
    }
    let mut text = String::from("Reports\n");
    for row in rows {
        let report = &row.report;
        let _ = write!(
            text,
            "\n{}. {} ({} min){} {}\n    {}",
            row.position,
            report.start_time.format(LIST_TIME_FORMAT),
            report.duration_minutes,
            if row.favorite { " 🌟" } else { "" },
            report.title,
            report.speakers
        );
    }
    text
}

fn evaluation_list(entries: &[EvaluationEntry]) -> String {
    if entries.is_empty() {
        return "You have not evaluated any reports yet.".to_string();
    }
    let mut text = String::from("Your evaluations\n");
    for entry in entries {
        let evaluation = &entry.evaluation;
        let _ = write!(
            text,
            "\n{}. {}\n    content: {}",
            entry.position,
            entry.report.label(),
            content_text(&evaluation.content)
        );
        if let Some(performance) = evaluation.performance {
            let _ = write!(text, ", delivery: {performance}");
        }
        if !evaluation.comment.is_empty() {
            let _ = write!(text, "\n    \"{}\"", evaluation.comment);
        }
    }
    text
}

fn content_text(content: &ContentScore) -> String {
    match content {
        ContentScore::Rated(score) => score.to_string(),
        ContentScore::NotAttended => "not attended".to_string(),
        ContentScore::Declined => "declined".to_string(),
    }
}

fn titles(reports: &[Report]) -> String {
    reports
        .iter()
        .map(|r| format!("• {}", r.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

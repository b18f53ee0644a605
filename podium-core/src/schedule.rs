//! Parsing of uploaded schedule files.
//!
//! One report per line, five comma-separated fields:
//! `start, duration, title, speakers, url`. Fields may be double-quoted
//! (`""` escapes a quote); leading spaces are ignored.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::model::{Report, TIMESTAMP_FORMAT};

const FIELDS_PER_ROW: usize = 5;

/// Inclusive bounds for report start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

impl ScheduleWindow {
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.starts_at <= time && time <= self.ends_at
    }
}

/// A rejected upload. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("the schedule contains no reports")]
    Empty,

    #[error("line {line}: expected 5 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: cannot read start time '{value}', expected dd/mm/yyyy hh:mm:ss")]
    StartTime { line: usize, value: String },

    #[error("line {line}: '{title}' starts at {start}, outside the conference dates")]
    OutsideWindow {
        line: usize,
        title: String,
        start: NaiveDateTime,
    },

    #[error("line {line}: duration '{value}' is not a positive number of minutes")]
    Duration { line: usize, value: String },

    #[error("line {line}: report URL is empty")]
    MissingUrl { line: usize },
}

impl ScheduleError {
    /// The offending line, if the error concerns one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Empty => None,
            Self::FieldCount { line, .. }
            | Self::UnterminatedQuote { line }
            | Self::StartTime { line, .. }
            | Self::OutsideWindow { line, .. }
            | Self::Duration { line, .. }
            | Self::MissingUrl { line } => Some(*line),
        }
    }
}

/// Parse a whole schedule file.
///
/// Stops at the first bad row. Blank lines and a leading byte-order mark
/// are skipped. A file with no rows at all is rejected.
pub fn parse_schedule(text: &str, window: &ScheduleWindow) -> Result<Vec<Report>, ScheduleError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reports = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        reports.push(parse_row(index + 1, raw, window)?);
    }
    if reports.is_empty() {
        return Err(ScheduleError::Empty);
    }
    Ok(reports)
}

fn parse_row(line: usize, raw: &str, window: &ScheduleWindow) -> Result<Report, ScheduleError> {
    let fields = split_row(raw).ok_or(ScheduleError::UnterminatedQuote { line })?;
    let [start, duration, title, speakers, url]: [String; FIELDS_PER_ROW] = fields
        .try_into()
        .map_err(|fields: Vec<String>| ScheduleError::FieldCount {
            line,
            found: fields.len(),
        })?;

    let start_time = NaiveDateTime::parse_from_str(start.trim(), TIMESTAMP_FORMAT).map_err(|_| {
        ScheduleError::StartTime {
            line,
            value: start.clone(),
        }
    })?;
    if !window.contains(start_time) {
        return Err(ScheduleError::OutsideWindow {
            line,
            title,
            start: start_time,
        });
    }

    let duration_minutes = duration
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| ScheduleError::Duration {
            line,
            value: duration.clone(),
        })?;

    let url = url.trim().to_string();
    if url.is_empty() {
        return Err(ScheduleError::MissingUrl { line });
    }

    Ok(Report {
        url,
        title: title.trim_end().to_string(),
        speakers: speakers.trim_end().to_string(),
        start_time,
        duration_minutes,
    })
}

/// Split one CSV line. Returns `None` when a quoted field never closes.
fn split_row(raw: &str) -> Option<Vec<String>> {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    let mut fields = Vec::new();
    let mut chars = raw.chars().peekable();

    loop {
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}

        let mut field = String::new();
        if chars.next_if_eq(&'"').is_some() {
            loop {
                match chars.next()? {
                    '"' if chars.next_if_eq(&'"').is_some() => field.push('"'),
                    '"' => break,
                    c => field.push(c),
                }
            }
            // Anything between the closing quote and the comma is kept verbatim.
            while let Some(c) = chars.next_if(|c| *c != ',') {
                field.push(c);
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',') {
                field.push(c);
            }
        }
        fields.push(field);

        if chars.next().is_none() {
            return Some(fields);
        }
    }
}

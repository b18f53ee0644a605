//! Domain records: reports, users, evaluations and scores.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};

/// Platform user id of a chat participant.
pub type UserId = i64;

/// Timestamp layout used by schedule rows and conference bounds.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// A talk on the conference schedule, identified by its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub url: String,
    pub title: String,
    pub speakers: String,
    /// Start in conference-local time.
    pub start_time: NaiveDateTime,
    pub duration_minutes: u32,
}

impl Report {
    /// End of the talk. Never stored, always derived from start and duration.
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether the talk has begun at `now` and may be evaluated.
    pub fn has_started(&self, now: NaiveDateTime) -> bool {
        self.start_time <= now
    }

    /// Short human label, "speakers - title".
    pub fn label(&self) -> String {
        format!("{} - {}", self.speakers, self.title)
    }
}

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub id: UserId,
    /// Free text the organizers use to recognize the participant.
    pub identification: String,
    /// URLs of favorited reports.
    pub favorites: BTreeSet<String>,
}

impl User {
    pub fn new(id: UserId, identification: impl Into<String>) -> Self {
        Self {
            id,
            identification: identification.into(),
            favorites: BTreeSet::new(),
        }
    }

    /// Whether reminders about `url` should reach this user.
    ///
    /// A user without favorites follows the whole schedule; otherwise only
    /// favorited reports count.
    pub fn follows(&self, url: &str) -> bool {
        self.favorites.is_empty() || self.favorites.contains(url)
    }
}

/// A rating on the 1-5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every score from lowest to highest.
    pub fn all() -> impl Iterator<Item = Score> {
        (Self::MIN..=Self::MAX).map(Score)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when text is not a score between 1 and 5.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid score: {0}")]
pub struct InvalidScore(pub String);

impl FromStr for Score {
    type Err = InvalidScore;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>()
            .ok()
            .and_then(Score::new)
            .ok_or_else(|| InvalidScore(s.to_string()))
    }
}

const NOT_ATTENDED: &str = "noEvaluate";
const DECLINED: &str = "noWishToEvaluate";

/// The content part of an evaluation: a score or one of the opt-out markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentScore {
    Rated(Score),
    /// The participant did not attend the talk.
    NotAttended,
    /// The participant attended but chose not to rate.
    Declined,
}

impl ContentScore {
    /// Storage encoding: the digit for scores, a keyword for markers.
    pub fn encode(&self) -> String {
        match self {
            Self::Rated(score) => score.to_string(),
            Self::NotAttended => NOT_ATTENDED.to_string(),
            Self::Declined => DECLINED.to_string(),
        }
    }

    pub fn decode(raw: &str) -> Option<Self> {
        match raw {
            NOT_ATTENDED => Some(Self::NotAttended),
            DECLINED => Some(Self::Declined),
            other => other.parse().ok().map(Self::Rated),
        }
    }
}

/// One participant's evaluation of one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub user_id: UserId,
    pub url: String,
    pub content: ContentScore,
    /// Present only when `content` is a score.
    pub performance: Option<Score>,
    /// Empty when the participant skipped the comment.
    pub comment: String,
}

impl Evaluation {
    /// A full evaluation with both scores.
    pub fn rated(
        user_id: UserId,
        url: impl Into<String>,
        content: Score,
        performance: Score,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            url: url.into(),
            content: ContentScore::Rated(content),
            performance: Some(performance),
            comment: comment.into(),
        }
    }

    /// An evaluation carrying only an opt-out marker.
    pub fn opted_out(user_id: UserId, url: impl Into<String>, marker: ContentScore) -> Self {
        Self {
            user_id,
            url: url.into(),
            content: marker,
            performance: None,
            comment: String::new(),
        }
    }
}

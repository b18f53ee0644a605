use thiserror::Error;

use crate::model::Score;
use crate::text::{join_fields, split_fields};

const AWAITING_IDENTITY: &str = "start";
const MENU: &str = "menu";
const CONFERENCE_INFO: &str = "confInfo";
const BROWSING: &str = "viewReports";
const EDITING_IDENTITY: &str = "updateIdentification";
const AWAITING_UPLOAD: &str = "uploadSchedule";
const REVIEWING: &str = "userEvaluations";
const DONE: &str = "evaluationDone";
const EVALUATE: &str = "evaluateReport";
const RATE_CONTENT: &str = "rateContent";
const UPDATE: &str = "updateEvaluation";

/// The report under evaluation and the prompt shown for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub url: String,
    pub prompt: String,
}

impl Draft {
    pub fn new(url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prompt: prompt.into(),
        }
    }
}

/// Where a user is in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    /// Never talked to the bot.
    New,
    AwaitingIdentity,
    Menu,
    ConferenceInfo,
    Browsing,
    EditingIdentity,
    AwaitingUpload,
    ReviewingEvaluations,
    /// An evaluation or edit was just stored.
    Done,
    Evaluating(Draft),
    ContentPending(Draft),
    PerformancePending {
        draft: Draft,
        content: Score,
    },
    CommentPending {
        draft: Draft,
        content: Score,
        performance: Score,
    },
    UpdateContentPending {
        url: String,
    },
    UpdatePerformancePending {
        url: String,
        content: Score,
    },
    UpdateCommentPending {
        url: String,
        content: Score,
        performance: Score,
    },
}

/// A stored state string that matches no known step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state '{0}' ends with a dangling escape")]
    Malformed(String),

    #[error("state '{0}' matches no wizard step")]
    Unrecognized(String),

    #[error("state '{state}' carries invalid score '{value}'")]
    InvalidScore { state: String, value: String },
}

impl WizardState {
    /// Serialize for the state store.
    ///
    /// The first field together with the field count identifies the step.
    pub fn encode(&self) -> String {
        match self {
            Self::New => String::new(),
            Self::AwaitingIdentity => AWAITING_IDENTITY.to_string(),
            Self::Menu => MENU.to_string(),
            Self::ConferenceInfo => CONFERENCE_INFO.to_string(),
            Self::Browsing => BROWSING.to_string(),
            Self::EditingIdentity => EDITING_IDENTITY.to_string(),
            Self::AwaitingUpload => AWAITING_UPLOAD.to_string(),
            Self::ReviewingEvaluations => REVIEWING.to_string(),
            Self::Done => DONE.to_string(),
            Self::Evaluating(d) => join_fields([EVALUATE, d.url.as_str(), d.prompt.as_str()]),
            Self::ContentPending(d) => {
                join_fields([RATE_CONTENT, d.url.as_str(), d.prompt.as_str()])
            }
            Self::PerformancePending { draft, content } => join_fields([
                EVALUATE,
                draft.url.as_str(),
                draft.prompt.as_str(),
                content.to_string().as_str(),
            ]),
            Self::CommentPending {
                draft,
                content,
                performance,
            } => join_fields([
                EVALUATE,
                draft.url.as_str(),
                draft.prompt.as_str(),
                content.to_string().as_str(),
                performance.to_string().as_str(),
            ]),
            Self::UpdateContentPending { url } => join_fields([UPDATE, url.as_str()]),
            Self::UpdatePerformancePending { url, content } => {
                join_fields([UPDATE, url.as_str(), content.to_string().as_str()])
            }
            Self::UpdateCommentPending {
                url,
                content,
                performance,
            } => join_fields([
                UPDATE,
                url.as_str(),
                content.to_string().as_str(),
                performance.to_string().as_str(),
            ]),
        }
    }

    /// Parse a stored state string. The empty string is [`WizardState::New`].
    pub fn decode(raw: &str) -> Result<Self, StateError> {
        if raw.is_empty() {
            return Ok(Self::New);
        }
        let fields = split_fields(raw).ok_or_else(|| StateError::Malformed(raw.to_string()))?;
        let state = match fields.as_slice() {
            [head] => match head.as_str() {
                AWAITING_IDENTITY => Self::AwaitingIdentity,
                MENU => Self::Menu,
                CONFERENCE_INFO => Self::ConferenceInfo,
                BROWSING => Self::Browsing,
                EDITING_IDENTITY => Self::EditingIdentity,
                AWAITING_UPLOAD => Self::AwaitingUpload,
                REVIEWING => Self::ReviewingEvaluations,
                DONE => Self::Done,
                _ => return Err(StateError::Unrecognized(raw.to_string())),
            },
            [head, url, prompt] if head == EVALUATE => Self::Evaluating(Draft::new(url, prompt)),
            [head, url, prompt] if head == RATE_CONTENT => {
                Self::ContentPending(Draft::new(url, prompt))
            }
            [head, url, prompt, content] if head == EVALUATE => Self::PerformancePending {
                draft: Draft::new(url, prompt),
                content: parse_score(raw, content)?,
            },
            [head, url, prompt, content, performance] if head == EVALUATE => {
                Self::CommentPending {
                    draft: Draft::new(url, prompt),
                    content: parse_score(raw, content)?,
                    performance: parse_score(raw, performance)?,
                }
            }
            [head, url] if head == UPDATE => Self::UpdateContentPending { url: url.clone() },
            [head, url, content] if head == UPDATE => Self::UpdatePerformancePending {
                url: url.clone(),
                content: parse_score(raw, content)?,
            },
            [head, url, content, performance] if head == UPDATE => Self::UpdateCommentPending {
                url: url.clone(),
                content: parse_score(raw, content)?,
                performance: parse_score(raw, performance)?,
            },
            _ => return Err(StateError::Unrecognized(raw.to_string())),
        };
        Ok(state)
    }

    /// Whether the user has registered an identification.
    pub fn is_registered(&self) -> bool {
        !matches!(self, Self::New | Self::AwaitingIdentity)
    }
}

fn parse_score(raw: &str, value: &str) -> Result<Score, StateError> {
    value.parse().map_err(|_| StateError::InvalidScore {
        state: raw.to_string(),
        value: value.to_string(),
    })
}

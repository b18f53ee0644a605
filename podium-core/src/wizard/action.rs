use crate::model::{Score, UserId};

/// Who sent an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(user_id: UserId, is_admin: bool) -> Self {
        Self { user_id, is_admin }
    }
}

/// An inbound user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The `/start` command.
    Start,
    Text(String),
    Button(Action),
    /// Contents of an uploaded schedule file.
    Upload(String),
}

/// A button tap, decoded from its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Back to the main menu from anywhere.
    Menu,
    /// One step back within the current flow.
    Back,
    ConferenceInfo,
    ViewReports,
    EditIdentity,
    UploadSchedule,
    ExportEvaluations,
    AddFavorite(String),
    RemoveFavorite(String),
    Evaluate(String),
    /// Tapped the placeholder of a report that has not started.
    NotYetAvailable,
    BeginRating,
    Content(Score),
    Performance(Score),
    SkipComment,
    NotAttended,
    Decline,
    MyEvaluations,
    EditEvaluation(String),
    DeleteEvaluation(String),
    UpdateContent(Score),
    UpdatePerformance(Score),
    UpdateSkipComment,
}

impl Action {
    /// Encode as button payload.
    pub fn payload(&self) -> String {
        match self {
            Self::Menu => "back".to_string(),
            Self::Back => "stepBack".to_string(),
            Self::ConferenceInfo => "confInfo".to_string(),
            Self::ViewReports => "viewReports".to_string(),
            Self::EditIdentity => "updateIdentification".to_string(),
            Self::UploadSchedule => "uploadSchedule".to_string(),
            Self::ExportEvaluations => "downloadReviews".to_string(),
            Self::AddFavorite(url) => format!("add;{url}"),
            Self::RemoveFavorite(url) => format!("remove;{url}"),
            Self::Evaluate(url) => format!("evaluateReport;{url}"),
            Self::NotYetAvailable => "notEvaluateReport".to_string(),
            Self::BeginRating => "evaluationBegin".to_string(),
            Self::Content(k) => format!("content;{k}"),
            Self::Performance(m) => format!("performance;{m}"),
            Self::SkipComment => "evaluationEnd".to_string(),
            Self::NotAttended => "noEvaluate".to_string(),
            Self::Decline => "noWishToEvaluate".to_string(),
            Self::MyEvaluations => "userEvaluations".to_string(),
            Self::EditEvaluation(url) => format!("updateEvaluation;{url}"),
            Self::DeleteEvaluation(url) => format!("deleteEvaluation;{url}"),
            Self::UpdateContent(k) => format!("updateContent;{k}"),
            Self::UpdatePerformance(m) => format!("updatePerformance;{m}"),
            Self::UpdateSkipComment => "updateNoComment".to_string(),
        }
    }

    /// Decode a button payload. Unknown payloads yield `None`.
    pub fn parse(payload: &str) -> Option<Self> {
        if let Some((tag, arg)) = payload.split_once(';') {
            let url = || (!arg.is_empty()).then(|| arg.to_string());
            return match tag {
                "add" => url().map(Self::AddFavorite),
                "remove" => url().map(Self::RemoveFavorite),
                "evaluateReport" => url().map(Self::Evaluate),
                "updateEvaluation" => url().map(Self::EditEvaluation),
                "deleteEvaluation" => url().map(Self::DeleteEvaluation),
                "content" => arg.parse().ok().map(Self::Content),
                "performance" => arg.parse().ok().map(Self::Performance),
                "updateContent" => arg.parse().ok().map(Self::UpdateContent),
                "updatePerformance" => arg.parse().ok().map(Self::UpdatePerformance),
                _ => None,
            };
        }
        let action = match payload {
            "back" => Self::Menu,
            "stepBack" => Self::Back,
            "confInfo" => Self::ConferenceInfo,
            "viewReports" => Self::ViewReports,
            "updateIdentification" => Self::EditIdentity,
            "uploadSchedule" => Self::UploadSchedule,
            "downloadReviews" => Self::ExportEvaluations,
            "notEvaluateReport" => Self::NotYetAvailable,
            "evaluationBegin" => Self::BeginRating,
            "evaluationEnd" => Self::SkipComment,
            "noEvaluate" => Self::NotAttended,
            "noWishToEvaluate" => Self::Decline,
            "userEvaluations" => Self::MyEvaluations,
            "updateNoComment" => Self::UpdateSkipComment,
            _ => return None,
        };
        Some(action)
    }
}

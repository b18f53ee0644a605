//! The evaluation wizard.
//!
//! [`Wizard::advance`] takes a user's current [`WizardState`] and one inbound
//! [`Event`] and returns the next state plus an ordered list of [`Effect`]s.
//! It reads the catalog to make decisions but never writes: writes come
//! back as effects for the caller to apply.

mod action;
mod state;

pub use action::{Action, Actor, Event};
pub use state::{Draft, StateError, WizardState};

use std::sync::Arc;

use crate::clock::Clock;
use crate::model::{ContentScore, Evaluation, Score};
use crate::storage::{CatalogStore, StorageError};


/// Prefix that marks text as a bot command rather than an identification.
const COMMAND_MARKER: char = '/';

/// A store write requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    SetIdentification(String),
    AddFavorite(String),
    RemoveFavorite(String),
    SaveEvaluation(Evaluation),
    UpdateEvaluation(Evaluation),
    DeleteEvaluation(String),
}

/// The greeting line above the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    Registered,
    WelcomeBack,
    AfterUpload,
    AfterIdentityEdit,
    Returned,
    /// The stored conversation step was unreadable or stale.
    SessionReset,
}

/// Short acknowledgement that does not replace the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toast {
    NotYetAvailable,
    ReportUnavailable,
    AdminOnly,
    FavoriteAdded,
    FavoriteRemoved,
    /// The evaluation to edit no longer exists.
    NothingToEdit,
}

/// A screen to present. Data-bearing screens are filled in by the engine
/// after the transition's writes are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    AskIdentity,
    IdentityRejected,
    Menu(Greeting),
    ConferenceInfo,
    Reports,
    EditIdentity,
    IdentityChanged,
    AwaitUpload,
    RateReport { prompt: String },
    ContentScale,
    PerformanceScale,
    CommentPrompt,
    EvaluationSaved,
    EvaluationSkipped(ContentScore),
    MyEvaluations,
    UpdateContentScale { prompt: String },
    UpdatePerformanceScale,
    UpdateCommentPrompt,
    /// Whether the preceding update write changed anything.
    UpdateOutcome,
    /// Whether the preceding delete write removed anything.
    DeleteOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Write(Write),
    Show(View),
    Toast(Toast),
    /// Remove the user's message from the chat.
    DiscardInput,
    ImportSchedule(String),
    ExportEvaluations,
}

/// The decision for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: WizardState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: WizardState) -> Self {
        Self {
            next,
            effects: Vec::new(),
        }
    }

    fn write(mut self, write: Write) -> Self {
        self.effects.push(Effect::Write(write));
        self
    }

    fn show(mut self, view: View) -> Self {
        self.effects.push(Effect::Show(view));
        self
    }

    fn toast(mut self, toast: Toast) -> Self {
        self.effects.push(Effect::Toast(toast));
        self
    }

    fn effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn menu(greeting: Greeting) -> Self {
        Self::to(WizardState::Menu).show(View::Menu(greeting))
    }
}

pub struct Wizard {
    catalog: Arc<dyn CatalogStore>,
    clock: Arc<dyn Clock>,
}

impl Wizard {
    pub fn new(catalog: Arc<dyn CatalogStore>, clock: Arc<dyn Clock>) -> Self {
        Self { catalog, clock }
    }

    /// Decide the next state and effects for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if a catalog read needed for the decision fails.
    pub async fn advance(
        &self,
        actor: &Actor,
        state: WizardState,
        event: Event,
    ) -> Result<Transition, StorageError> {
        match event {
            Event::Start => Ok(on_start(state)),
            Event::Text(text) => Ok(on_text(actor, state, text)),
            Event::Upload(contents) => Ok(on_upload(actor, state, contents)),
            Event::Button(action) => self.on_button(actor, state, action).await,
        }
    }

    async fn on_button(
        &self,
        actor: &Actor,
        state: WizardState,
        action: Action,
    ) -> Result<Transition, StorageError> {
        if !state.is_registered() {
            return Ok(Transition::to(WizardState::AwaitingIdentity).show(View::AskIdentity));
        }

        let transition = match action {
            Action::Menu => Transition::menu(Greeting::Returned),
            Action::ConferenceInfo => {
                Transition::to(WizardState::ConferenceInfo).show(View::ConferenceInfo)
            }
            Action::ViewReports => Transition::to(WizardState::Browsing).show(View::Reports),
            Action::EditIdentity => {
                Transition::to(WizardState::EditingIdentity).show(View::EditIdentity)
            }
            Action::UploadSchedule if actor.is_admin => {
                Transition::to(WizardState::AwaitingUpload).show(View::AwaitUpload)
            }
            Action::ExportEvaluations if actor.is_admin => {
                Transition::to(state).effect(Effect::ExportEvaluations)
            }
            Action::UploadSchedule | Action::ExportEvaluations => {
                Transition::to(state).toast(Toast::AdminOnly)
            }
            Action::NotYetAvailable => Transition::to(state).toast(Toast::NotYetAvailable),
            Action::AddFavorite(url) => match self.catalog.get_report(&url).await? {
                Some(_) => Transition::to(WizardState::Browsing)
                    .write(Write::AddFavorite(url))
                    .toast(Toast::FavoriteAdded)
                    .show(View::Reports),
                None => Transition::to(WizardState::Browsing)
                    .toast(Toast::ReportUnavailable)
                    .show(View::Reports),
            },
            Action::RemoveFavorite(url) => Transition::to(WizardState::Browsing)
                .write(Write::RemoveFavorite(url))
                .toast(Toast::FavoriteRemoved)
                .show(View::Reports),
            Action::Evaluate(url) => match self.catalog.get_report(&url).await? {
                None => Transition::to(state).toast(Toast::ReportUnavailable),
                Some(report) if !report.has_started(self.clock.now()) => {
                    Transition::to(state).toast(Toast::NotYetAvailable)
                }
                Some(report) => {
                    let prompt = report.label();
                    Transition::to(WizardState::Evaluating(Draft::new(url, prompt.clone())))
                        .show(View::RateReport { prompt })
                }
            },
            Action::MyEvaluations => {
                Transition::to(WizardState::ReviewingEvaluations).show(View::MyEvaluations)
            }
            Action::EditEvaluation(url) => {
                let report = self.catalog.get_report(&url).await?;
                let existing = self.catalog.get_evaluation(actor.user_id, &url).await?;
                match (report, existing) {
                    (None, _) => Transition::to(state).toast(Toast::ReportUnavailable),
                    (Some(_), None) => Transition::to(state).toast(Toast::NothingToEdit),
                    (Some(report), Some(_)) => {
                        Transition::to(WizardState::UpdateContentPending { url })
                            .show(View::UpdateContentScale {
                                prompt: report.label(),
                            })
                    }
                }
            }
            Action::DeleteEvaluation(url) => Transition::to(WizardState::Done)
                .write(Write::DeleteEvaluation(url))
                .show(View::DeleteOutcome),
            step => on_step(actor, state, step),
        };
        Ok(transition)
    }
}

fn is_command(text: &str) -> bool {
    text.starts_with(COMMAND_MARKER)
}

fn on_start(state: WizardState) -> Transition {
    match state {
        WizardState::New | WizardState::AwaitingIdentity => {
            Transition::to(WizardState::AwaitingIdentity).show(View::AskIdentity)
        }
        WizardState::AwaitingUpload => Transition::menu(Greeting::AfterUpload),
        WizardState::EditingIdentity => Transition::menu(Greeting::AfterIdentityEdit),
        _ => Transition::menu(Greeting::WelcomeBack),
    }
}

fn on_text(actor: &Actor, state: WizardState, text: String) -> Transition {
    let text = text.trim().to_string();
    match state {
        WizardState::New | WizardState::AwaitingIdentity => {
            if text.is_empty() || is_command(&text) {
                Transition::to(WizardState::AwaitingIdentity).show(View::IdentityRejected)
            } else {
                Transition::to(WizardState::Menu)
                    .write(Write::SetIdentification(text))
                    .show(View::Menu(Greeting::Registered))
            }
        }
        WizardState::EditingIdentity => {
            if text.is_empty() || is_command(&text) {
                Transition::to(state).show(View::IdentityRejected)
            } else {
                Transition::to(state)
                    .write(Write::SetIdentification(text))
                    .show(View::IdentityChanged)
            }
        }
        WizardState::CommentPending {
            draft,
            content,
            performance,
        } => save(actor, &draft.url, content, performance, text),
        WizardState::UpdateCommentPending {
            url,
            content,
            performance,
        } => update(actor, &url, content, performance, text),
        WizardState::Menu | WizardState::ConferenceInfo | WizardState::Done => {
            Transition::menu(Greeting::Returned)
        }
        other => Transition::to(other).effect(Effect::DiscardInput),
    }
}

fn on_upload(actor: &Actor, state: WizardState, contents: String) -> Transition {
    match state {
        WizardState::AwaitingUpload if actor.is_admin => {
            Transition::to(state).effect(Effect::ImportSchedule(contents))
        }
        other => Transition::to(other).effect(Effect::DiscardInput),
    }
}

/// Buttons that only make sense inside one evaluation step.
fn on_step(actor: &Actor, state: WizardState, action: Action) -> Transition {
    use WizardState as S;

    match (state, action) {
        (S::Evaluating(draft), Action::BeginRating) => {
            Transition::to(S::ContentPending(draft)).show(View::ContentScale)
        }
        (S::Evaluating(draft), Action::NotAttended) => {
            opt_out(actor, draft, ContentScore::NotAttended)
        }
        (S::Evaluating(draft), Action::Decline) => opt_out(actor, draft, ContentScore::Declined),
        (S::ContentPending(draft), Action::Content(content)) => {
            Transition::to(S::PerformancePending { draft, content }).show(View::PerformanceScale)
        }
        (S::PerformancePending { draft, content }, Action::Performance(performance)) => {
            Transition::to(S::CommentPending {
                draft,
                content,
                performance,
            })
            .show(View::CommentPrompt)
        }
        (
            S::CommentPending {
                draft,
                content,
                performance,
            },
            Action::SkipComment,
        ) => save(actor, &draft.url, content, performance, String::new()),
        (
            S::ContentPending(draft)
            | S::PerformancePending { draft, .. }
            | S::CommentPending { draft, .. },
            Action::Back,
        ) => {
            let prompt = draft.prompt.clone();
            Transition::to(S::Evaluating(draft)).show(View::RateReport { prompt })
        }
        (S::UpdateContentPending { url }, Action::UpdateContent(content)) => {
            Transition::to(S::UpdatePerformancePending { url, content })
                .show(View::UpdatePerformanceScale)
        }
        (S::UpdatePerformancePending { url, content }, Action::UpdatePerformance(performance)) => {
            Transition::to(S::UpdateCommentPending {
                url,
                content,
                performance,
            })
            .show(View::UpdateCommentPrompt)
        }
        (
            S::UpdateCommentPending {
                url,
                content,
                performance,
            },
            Action::UpdateSkipComment,
        ) => update(actor, &url, content, performance, String::new()),
        (
            S::UpdateContentPending { .. }
            | S::UpdatePerformancePending { .. }
            | S::UpdateCommentPending { .. },
            Action::Back,
        ) => Transition::to(S::ReviewingEvaluations).show(View::MyEvaluations),
        (_, Action::Back) => Transition::menu(Greeting::Returned),
        (state, action) => {
            tracing::debug!(?state, ?action, "button does not belong to current step");
            Transition::menu(Greeting::SessionReset)
        }
    }
}

fn save(
    actor: &Actor,
    url: &str,
    content: Score,
    performance: Score,
    comment: String,
) -> Transition {
    let evaluation = Evaluation::rated(actor.user_id, url, content, performance, comment);
    Transition::to(WizardState::Done)
        .write(Write::SaveEvaluation(evaluation))
        .show(View::EvaluationSaved)
}

fn update(
    actor: &Actor,
    url: &str,
    content: Score,
    performance: Score,
    comment: String,
) -> Transition {
    let evaluation = Evaluation::rated(actor.user_id, url, content, performance, comment);
    Transition::to(WizardState::Done)
        .write(Write::UpdateEvaluation(evaluation))
        .show(View::UpdateOutcome)
}

fn opt_out(actor: &Actor, draft: Draft, marker: ContentScore) -> Transition {
    let evaluation = Evaluation::opted_out(actor.user_id, draft.url, marker);
    Transition::to(WizardState::Done)
        .write(Write::SaveEvaluation(evaluation))
        .show(View::EvaluationSkipped(marker))
}

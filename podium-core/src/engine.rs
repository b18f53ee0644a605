//! Conversation engine.
//!
//! [`Engine::handle`] is the single entry point for chat front ends: it
//! serializes events per user, loads and decodes the stored wizard step,
//! runs the [`Wizard`], applies the resulting writes and turns the
//! requested views into data-carrying [`Screen`]s.

mod locks;

use std::sync::Arc;

use thiserror::Error;

use crate::clock::Clock;
use crate::export::{export_records, to_json};
use crate::model::{ContentScore, Evaluation, Report, UserId};
use crate::notify::Notifier;
use crate::schedule::{ScheduleError, ScheduleWindow};
use crate::storage::{CatalogStore, StateStore, StorageError};
use crate::sync::{ReportSynchronizer, SyncOutcome, UploadError};
use crate::wizard::{Actor, Effect, Event, Greeting, Toast, View, Wizard, WizardState, Write};

use locks::UserLocks;


/// File name used for evaluation exports.
pub const EXPORT_FILE_NAME: &str = "evaluations.json";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to serialize export: {0}")]
    Export(#[from] serde_json::Error),
}

/// One line of the report list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// 1-based position in schedule order.
    pub position: usize,
    pub report: Report,
    pub favorite: bool,
    /// The report has started and can be evaluated.
    pub open: bool,
}

/// One line of the user's own evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationEntry {
    pub position: usize,
    pub report: Report,
    pub evaluation: Evaluation,
}

/// A screen with the data it shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    AskIdentity,
    IdentityRejected,
    Menu {
        greeting: Greeting,
        identification: String,
        is_admin: bool,
    },
    ConferenceInfo,
    Reports {
        rows: Vec<ReportRow>,
        has_evaluations: bool,
    },
    EditIdentity {
        current: String,
    },
    IdentityChanged {
        identification: String,
    },
    AwaitUpload,
    ScheduleImported {
        reports: usize,
        outcome: SyncOutcome,
    },
    UploadRejected(ScheduleError),
    RateReport {
        prompt: String,
    },
    ContentScale,
    PerformanceScale,
    CommentPrompt,
    EvaluationSaved,
    EvaluationSkipped(ContentScore),
    MyEvaluations {
        entries: Vec<EvaluationEntry>,
    },
    UpdateContentScale {
        prompt: String,
    },
    UpdatePerformanceScale,
    UpdateCommentPrompt,
    EvaluationUpdated {
        changed: bool,
    },
    EvaluationDeleted {
        existed: bool,
    },
}

/// Evaluation export ready to send as a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub evaluations: usize,
}

/// Something the front end must present, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Screen(Screen),
    Toast(Toast),
    DiscardInput,
    Document(ExportFile),
}

pub struct Engine {
    catalog: Arc<dyn CatalogStore>,
    states: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    wizard: Wizard,
    synchronizer: ReportSynchronizer,
    locks: UserLocks,
}

impl Engine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        states: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        window: ScheduleWindow,
    ) -> Self {
        Self {
            wizard: Wizard::new(Arc::clone(&catalog), Arc::clone(&clock)),
            synchronizer: ReportSynchronizer::new(Arc::clone(&catalog), notifier, window),
            catalog,
            states,
            clock,
            locks: UserLocks::default(),
        }
    }

    /// Process one inbound event for `actor`.
    ///
    /// Events of the same user are handled one at a time; events of
    /// different users run concurrently. An unreadable stored step is
    /// treated as the main menu, or as a fresh start for unregistered users.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if a store operation fails. Writes applied
    /// before the failure are kept and the stored step is left unchanged.
    pub async fn handle(&self, actor: &Actor, event: Event) -> Result<Vec<Output>, EngineError> {
        let _guard = self.locks.acquire(actor.user_id).await;

        let (state, recovered) = self.load_state(actor.user_id).await?;
        let transition = self.wizard.advance(actor, state.clone(), event).await?;

        let mut outputs = Vec::with_capacity(transition.effects.len());
        let mut last_write = false;
        for effect in transition.effects {
            match effect {
                Effect::Write(write) => last_write = self.apply(actor.user_id, write).await?,
                Effect::Show(view) => {
                    let screen = self.materialize(actor, view, last_write).await?;
                    outputs.push(Output::Screen(screen));
                }
                Effect::Toast(toast) => outputs.push(Output::Toast(toast)),
                Effect::DiscardInput => outputs.push(Output::DiscardInput),
                Effect::ImportSchedule(text) => {
                    outputs.push(Output::Screen(self.import(actor.user_id, &text).await?));
                }
                Effect::ExportEvaluations => outputs.push(Output::Document(self.export().await?)),
            }
        }

        if recovered || transition.next != state {
            self.states
                .set_state(actor.user_id, &transition.next.encode())
                .await?;
        }
        Ok(outputs)
    }

    /// Whether a document from `actor` would be taken as a schedule upload.
    pub async fn accepts_upload(&self, actor: &Actor) -> Result<bool, EngineError> {
        if !actor.is_admin {
            return Ok(false);
        }
        let (state, _) = self.load_state(actor.user_id).await?;
        Ok(state == WizardState::AwaitingUpload)
    }

    async fn load_state(&self, user: UserId) -> Result<(WizardState, bool), StorageError> {
        let raw = self.states.get_state(user).await?;
        match WizardState::decode(&raw) {
            Ok(state) => Ok((state, false)),
            Err(e) => {
                tracing::warn!(user, error = %e, "discarding unreadable wizard state");
                let fallback = match self.catalog.get_user(user).await? {
                    Some(_) => WizardState::Menu,
                    None => WizardState::New,
                };
                Ok((fallback, true))
            }
        }
    }

    /// Apply one write. Returns whether the store reported a change.
    async fn apply(&self, user: UserId, write: Write) -> Result<bool, StorageError> {
        match write {
            Write::SetIdentification(identification) => {
                self.catalog
                    .set_identification(user, &identification)
                    .await?;
                Ok(true)
            }
            Write::AddFavorite(url) => self.catalog.add_favorite(user, &url).await,
            Write::RemoveFavorite(url) => self.catalog.remove_favorite(user, &url).await,
            Write::SaveEvaluation(evaluation) => {
                self.catalog.save_evaluation(&evaluation).await?;
                tracing::info!(user, url = %evaluation.url, "evaluation saved");
                Ok(true)
            }
            Write::UpdateEvaluation(evaluation) => {
                let changed = self.catalog.update_evaluation(&evaluation).await?;
                tracing::info!(user, url = %evaluation.url, changed, "evaluation updated");
                Ok(changed)
            }
            Write::DeleteEvaluation(url) => self.catalog.delete_evaluation(user, &url).await,
        }
    }

    async fn materialize(
        &self,
        actor: &Actor,
        view: View,
        last_write: bool,
    ) -> Result<Screen, StorageError> {
        let screen = match view {
            View::AskIdentity => Screen::AskIdentity,
            View::IdentityRejected => Screen::IdentityRejected,
            View::Menu(greeting) => Screen::Menu {
                greeting,
                identification: self.identification(actor.user_id).await?,
                is_admin: actor.is_admin,
            },
            View::ConferenceInfo => Screen::ConferenceInfo,
            View::Reports => self.reports_screen(actor.user_id).await?,
            View::EditIdentity => Screen::EditIdentity {
                current: self.identification(actor.user_id).await?,
            },
            View::IdentityChanged => Screen::IdentityChanged {
                identification: self.identification(actor.user_id).await?,
            },
            View::AwaitUpload => Screen::AwaitUpload,
            View::RateReport { prompt } => Screen::RateReport { prompt },
            View::ContentScale => Screen::ContentScale,
            View::PerformanceScale => Screen::PerformanceScale,
            View::CommentPrompt => Screen::CommentPrompt,
            View::EvaluationSaved => Screen::EvaluationSaved,
            View::EvaluationSkipped(marker) => Screen::EvaluationSkipped(marker),
            View::MyEvaluations => Screen::MyEvaluations {
                entries: self.evaluation_entries(actor.user_id).await?,
            },
            View::UpdateContentScale { prompt } => Screen::UpdateContentScale { prompt },
            View::UpdatePerformanceScale => Screen::UpdatePerformanceScale,
            View::UpdateCommentPrompt => Screen::UpdateCommentPrompt,
            View::UpdateOutcome => Screen::EvaluationUpdated {
                changed: last_write,
            },
            View::DeleteOutcome => Screen::EvaluationDeleted {
                existed: last_write,
            },
        };
        Ok(screen)
    }

    async fn identification(&self, user: UserId) -> Result<String, StorageError> {
        Ok(self
            .catalog
            .get_user(user)
            .await?
            .map(|u| u.identification)
            .unwrap_or_default())
    }

    async fn reports_screen(&self, user: UserId) -> Result<Screen, StorageError> {
        let now = self.clock.now();
        let favorites = self
            .catalog
            .get_user(user)
            .await?
            .map(|u| u.favorites)
            .unwrap_or_default();
        let rows = self
            .catalog
            .list_reports()
            .await?
            .into_iter()
            .enumerate()
            .map(|(i, report)| ReportRow {
                position: i + 1,
                favorite: favorites.contains(&report.url),
                open: report.has_started(now),
                report,
            })
            .collect();
        let has_evaluations = !self.catalog.list_evaluations_by_user(user).await?.is_empty();
        Ok(Screen::Reports {
            rows,
            has_evaluations,
        })
    }

    /// The user's evaluations in schedule order. Evaluations of removed
    /// reports are not listed.
    async fn evaluation_entries(&self, user: UserId) -> Result<Vec<EvaluationEntry>, StorageError> {
        let mut evaluations = self.catalog.list_evaluations_by_user(user).await?;
        let entries = self
            .catalog
            .list_reports()
            .await?
            .into_iter()
            .filter_map(|report| {
                let i = evaluations.iter().position(|e| e.url == report.url)?;
                Some((report, evaluations.swap_remove(i)))
            })
            .enumerate()
            .map(|(i, (report, evaluation))| EvaluationEntry {
                position: i + 1,
                report,
                evaluation,
            })
            .collect();
        Ok(entries)
    }

    async fn import(&self, uploader: UserId, text: &str) -> Result<Screen, StorageError> {
        match self.synchronizer.upload(uploader, text).await {
            Ok(receipt) => {
                tracing::info!(
                    uploader,
                    reports = receipt.reports,
                    broadcasts = receipt.deliveries.len(),
                    "schedule imported"
                );
                Ok(Screen::ScheduleImported {
                    reports: receipt.reports,
                    outcome: receipt.outcome,
                })
            }
            Err(UploadError::Schedule(e)) => {
                tracing::warn!(uploader, error = %e, "schedule upload rejected");
                Ok(Screen::UploadRejected(e))
            }
            Err(UploadError::Storage(e)) => Err(e),
        }
    }

    async fn export(&self) -> Result<ExportFile, EngineError> {
        let reports = self.catalog.list_reports().await?;
        let evaluations = self.catalog.list_all_evaluations().await?;
        let records = export_records(&reports, &evaluations);
        Ok(ExportFile {
            file_name: EXPORT_FILE_NAME.to_string(),
            bytes: to_json(&records)?,
            evaluations: records.len(),
        })
    }
}

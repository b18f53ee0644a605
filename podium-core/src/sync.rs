//! Reconciliation of an uploaded schedule against the stored reports.

use std::sync::Arc;

use thiserror::Error;

use crate::model::{Report, UserId};
use crate::notify::{Dispatches, Notification, Notifier};
use crate::schedule::{ScheduleError, ScheduleWindow, parse_schedule};
use crate::storage::{CatalogStore, StorageError};

/// What a reconciliation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    /// At least one report was inserted or had a field changed.
    pub updated: bool,
    /// At least one stored report was missing from the upload and removed.
    pub deleted: bool,
}

impl SyncOutcome {
    /// The single broadcast this outcome calls for. Removal wins over update.
    pub fn notice(&self) -> Option<ScheduleNotice> {
        if self.deleted {
            Some(ScheduleNotice::Removed)
        } else if self.updated {
            Some(ScheduleNotice::Updated)
        } else {
            None
        }
    }
}

/// Broadcast sent to participants after a schedule change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleNotice {
    Updated,
    Removed,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of a successful upload.
#[derive(Debug)]
pub struct UploadReceipt {
    pub reports: usize,
    pub outcome: SyncOutcome,
    pub deliveries: Dispatches,
}

pub struct ReportSynchronizer {
    catalog: Arc<dyn CatalogStore>,
    notifier: Arc<dyn Notifier>,
    window: ScheduleWindow,
}

impl ReportSynchronizer {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        notifier: Arc<dyn Notifier>,
        window: ScheduleWindow,
    ) -> Self {
        Self {
            catalog,
            notifier,
            window,
        }
    }

    /// Make the stored report set equal to `candidates`.
    ///
    /// Upserts every candidate by URL, then removes stored reports absent
    /// from the set. An empty set removes nothing. Not transactional: a
    /// store failure part way leaves earlier upserts applied.
    pub async fn reconcile(&self, candidates: &[Report]) -> Result<SyncOutcome, StorageError> {
        let mut outcome = SyncOutcome::default();
        for report in candidates {
            if self.catalog.upsert_report(report).await? {
                outcome.updated = true;
            }
        }

        let keep: Vec<String> = candidates.iter().map(|r| r.url.clone()).collect();
        let removed = self.catalog.delete_reports_not_in(&keep).await?;
        outcome.deleted = removed > 0;

        tracing::info!(
            candidates = candidates.len(),
            updated = outcome.updated,
            removed,
            "schedule reconciled"
        );
        Ok(outcome)
    }

    /// Parse, reconcile and announce an uploaded schedule.
    ///
    /// A malformed row rejects the whole file before anything is written.
    pub async fn upload(&self, uploader: UserId, text: &str) -> Result<UploadReceipt, UploadError> {
        let candidates = parse_schedule(text, &self.window)?;
        let outcome = self.reconcile(&candidates).await?;
        let deliveries = match outcome.notice() {
            Some(notice) => self.broadcast(uploader, notice).await?,
            None => Dispatches::default(),
        };
        Ok(UploadReceipt {
            reports: candidates.len(),
            outcome,
            deliveries,
        })
    }

    /// Send `notice` to every user except the uploader.
    async fn broadcast(
        &self,
        uploader: UserId,
        notice: ScheduleNotice,
    ) -> Result<Dispatches, StorageError> {
        let users = self.catalog.list_users().await?;
        let mut deliveries = Dispatches::default();
        for user in users.into_iter().filter(|u| u.id != uploader) {
            let notifier = Arc::clone(&self.notifier);
            deliveries.push(tokio::spawn(async move {
                let notification = Notification::ScheduleChanged(notice);
                if let Err(e) = notifier.notify(user.id, &notification).await {
                    tracing::warn!(user = user.id, error = %e, "schedule broadcast failed");
                }
            }));
        }
        tracing::info!(?notice, recipients = deliveries.len(), "schedule change broadcast");
        Ok(deliveries)
    }
}

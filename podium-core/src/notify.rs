//! Proactive reminders.
//!
//! [`NotificationScheduler`] wakes on a fixed interval and walks four rules
//! against the stored schedule: starts soon, please rate, end-of-day digest
//! and end-of-conference digest. Each message is claimed in the
//! [`NotificationLedger`] before it is sent, so no key is delivered twice.

mod ledger;

pub use ledger::{DedupKey, NotificationLedger};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::config::Config;
use crate::model::{Report, User, UserId};
use crate::storage::CatalogStore;
use crate::sync::ScheduleNotice;


/// A message pushed to a user outside of any conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    StartingSoon { report: Report },
    RateReport { report: Report },
    DayDigest { day: NaiveDate, reports: Vec<Report> },
    ConferenceDigest { reports: Vec<Report> },
    ScheduleChanged(ScheduleNotice),
}

impl Notification {
    /// Broadcasts disappear faster than personal reminders.
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Self::ScheduleChanged(_))
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery to user {user} failed: {reason}")]
    Delivery { user: UserId, reason: String },
}

/// Outbound port for proactive messages.
///
/// Implementations send the message and arrange its self-deletion; the
/// deletion must not delay the returned future.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: UserId, notification: &Notification) -> Result<(), NotifyError>;
}

/// Background deliveries started by one operation.
///
/// Dropping this detaches the tasks; [`Dispatches::settle`] waits for them.
#[derive(Debug, Default)]
pub struct Dispatches {
    handles: Vec<JoinHandle<()>>,
}

impl Dispatches {
    pub(crate) fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait until every delivery has finished.
    pub async fn settle(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "delivery task did not complete");
            }
        }
    }
}

/// Timing rules for the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPolicy {
    pub tick: std::time::Duration,
    pub lead: Duration,
    pub day_grace: Duration,
    pub conference_grace: Duration,
    pub conference_ends_at: NaiveDateTime,
}

impl NotificationPolicy {
    pub fn from_config(config: &Config) -> Self {
        let n = &config.notifications;
        Self {
            tick: n.tick(),
            lead: Duration::minutes(n.lead_minutes),
            day_grace: Duration::minutes(n.day_grace_minutes),
            conference_grace: Duration::hours(n.conference_grace_hours),
            conference_ends_at: config.conference.ends_at,
        }
    }
}

/// What one tick decided to send.
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub dispatched: Vec<DedupKey>,
    pub deliveries: Dispatches,
}

/// Per-tick cache of which reports each user has evaluated.
///
/// `None` marks a user whose lookup failed; rules skip that user this tick.
#[derive(Default)]
struct EvaluatedUrls(HashMap<UserId, Option<HashSet<String>>>);

impl EvaluatedUrls {
    async fn get(&mut self, catalog: &dyn CatalogStore, user: UserId) -> Option<&HashSet<String>> {
        if !self.0.contains_key(&user) {
            let loaded = match catalog.list_evaluations_by_user(user).await {
                Ok(list) => Some(list.into_iter().map(|e| e.url).collect()),
                Err(e) => {
                    tracing::warn!(
                        user,
                        error = %e,
                        "cannot load evaluations, skipping user this tick"
                    );
                    None
                }
            };
            self.0.insert(user, loaded);
        }
        self.0.get(&user).and_then(Option::as_ref)
    }
}

pub struct NotificationScheduler {
    catalog: Arc<dyn CatalogStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    ledger: Arc<NotificationLedger>,
    policy: NotificationPolicy,
}

impl NotificationScheduler {
    /// Create a scheduler with a fresh, empty ledger.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        policy: NotificationPolicy,
    ) -> Self {
        Self {
            catalog,
            notifier,
            clock,
            ledger: Arc::new(NotificationLedger::new()),
            policy,
        }
    }

    pub fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    /// Tick until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.policy.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.policy.tick.as_secs(),
            "notification scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.tick().await;
                    if !outcome.dispatched.is_empty() {
                        tracing::debug!(
                            count = outcome.dispatched.len(),
                            "notifications dispatched"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            ledger_size = self.ledger.len(),
            "notification scheduler stopped"
        );
    }

    /// Evaluate every rule once against the current time.
    ///
    /// Sends run as detached tasks; the returned outcome can await them.
    pub async fn tick(&self) -> TickOutcome {
        let now = self.clock.now();
        let mut outcome = TickOutcome::default();

        let reports = match self.catalog.list_reports().await {
            Ok(reports) => reports,
            Err(e) => {
                tracing::error!(error = %e, "notification tick skipped: cannot load reports");
                return outcome;
            }
        };
        let users = match self.catalog.list_users().await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "notification tick skipped: cannot load users");
                return outcome;
            }
        };
        if reports.is_empty() || users.is_empty() {
            return outcome;
        }

        let mut evaluated = EvaluatedUrls::default();
        self.remind_upcoming(now, &reports, &users, &mut outcome);
        self.ask_for_evaluations(now, &reports, &users, &mut evaluated, &mut outcome)
            .await;
        self.send_day_digests(now, &reports, &users, &mut evaluated, &mut outcome)
            .await;
        self.send_conference_digest(now, &reports, &users, &mut evaluated, &mut outcome)
            .await;
        outcome
    }

    fn remind_upcoming(
        &self,
        now: NaiveDateTime,
        reports: &[Report],
        users: &[User],
        outcome: &mut TickOutcome,
    ) {
        let Some(horizon) = now.checked_add_signed(self.policy.lead) else {
            tracing::error!(lead = %self.policy.lead, "reminder lead out of range, rule skipped");
            return;
        };
        for report in reports
            .iter()
            .filter(|r| r.start_time > now && r.start_time <= horizon)
        {
            for user in users.iter().filter(|u| u.follows(&report.url)) {
                let key = DedupKey::Start {
                    user: user.id,
                    url: report.url.clone(),
                };
                let notification = Notification::StartingSoon {
                    report: report.clone(),
                };
                self.dispatch(key, user.id, notification, outcome);
            }
        }
    }

    async fn ask_for_evaluations(
        &self,
        now: NaiveDateTime,
        reports: &[Report],
        users: &[User],
        evaluated: &mut EvaluatedUrls,
        outcome: &mut TickOutcome,
    ) {
        for report in reports.iter().filter(|r| r.end_time() <= now) {
            for user in users.iter().filter(|u| u.follows(&report.url)) {
                let key = DedupKey::End {
                    user: user.id,
                    url: report.url.clone(),
                };
                if self.ledger.contains(&key) {
                    continue;
                }
                let Some(done) = evaluated.get(self.catalog.as_ref(), user.id).await else {
                    continue;
                };
                if done.contains(&report.url) {
                    continue;
                }
                let notification = Notification::RateReport {
                    report: report.clone(),
                };
                self.dispatch(key, user.id, notification, outcome);
            }
        }
    }

    async fn send_day_digests(
        &self,
        now: NaiveDateTime,
        reports: &[Report],
        users: &[User],
        evaluated: &mut EvaluatedUrls,
        outcome: &mut TickOutcome,
    ) {
        let mut days: BTreeMap<NaiveDate, Vec<&Report>> = BTreeMap::new();
        for report in reports {
            days.entry(report.start_time.date()).or_default().push(report);
        }

        for (day, day_reports) in &days {
            let Some(last_end) = day_reports.iter().map(|r| r.end_time()).max() else {
                continue;
            };
            let Some(digest_after) = last_end.checked_add_signed(self.policy.day_grace) else {
                tracing::error!(
                    %day,
                    grace = %self.policy.day_grace,
                    "day grace out of range, digest skipped"
                );
                continue;
            };
            if now <= digest_after {
                continue;
            }
            for user in users {
                let key = DedupKey::Day {
                    user: user.id,
                    day: *day,
                };
                if self.ledger.contains(&key) {
                    continue;
                }
                let Some(done) = evaluated.get(self.catalog.as_ref(), user.id).await else {
                    continue;
                };
                let pending = unrated(day_reports.iter().copied(), user, done);
                if pending.is_empty() {
                    continue;
                }
                let notification = Notification::DayDigest {
                    day: *day,
                    reports: pending,
                };
                self.dispatch(key, user.id, notification, outcome);
            }
        }
    }

    async fn send_conference_digest(
        &self,
        now: NaiveDateTime,
        reports: &[Report],
        users: &[User],
        evaluated: &mut EvaluatedUrls,
        outcome: &mut TickOutcome,
    ) {
        let Some(digest_after) = self
            .policy
            .conference_ends_at
            .checked_add_signed(self.policy.conference_grace)
        else {
            tracing::error!(
                grace = %self.policy.conference_grace,
                "conference grace out of range, digest skipped"
            );
            return;
        };
        if now <= digest_after {
            return;
        }
        for user in users {
            let key = DedupKey::ConferenceEnd { user: user.id };
            if self.ledger.contains(&key) {
                continue;
            }
            let Some(done) = evaluated.get(self.catalog.as_ref(), user.id).await else {
                continue;
            };
            let pending = unrated(reports.iter(), user, done);
            if pending.is_empty() {
                continue;
            }
            let notification = Notification::ConferenceDigest { reports: pending };
            self.dispatch(key, user.id, notification, outcome);
        }
    }

    /// Claim `key` and send in the background. A failed send releases the
    /// claim so the next tick tries again.
    fn dispatch(
        &self,
        key: DedupKey,
        user: UserId,
        notification: Notification,
        outcome: &mut TickOutcome,
    ) {
        if !self.ledger.try_claim(key.clone()) {
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        let ledger = Arc::clone(&self.ledger);
        let claimed = key.clone();
        outcome.deliveries.push(tokio::spawn(async move {
            if let Err(e) = notifier.notify(user, &notification).await {
                tracing::warn!(key = %claimed, error = %e, "notification failed, will retry");
                ledger.release(&claimed);
            }
        }));
        outcome.dispatched.push(key);
    }
}

/// Reports `user` follows and has not evaluated yet.
fn unrated<'a>(
    reports: impl Iterator<Item = &'a Report>,
    user: &User,
    evaluated: &HashSet<String>,
) -> Vec<Report> {
    reports
        .filter(|r| user.follows(&r.url) && !evaluated.contains(&r.url))
        .cloned()
        .collect()
}

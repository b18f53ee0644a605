//! Podium core library.
//!
//! Provides the evaluation wizard, the schedule synchronizer, the
//! notification scheduler and the storage ports they run against.
//! Chat transports live in separate crates and talk to this one through
//! [`Engine`] and [`Notifier`].

pub mod clock;
pub mod config;
pub mod engine;
pub mod export;
pub mod model;
pub mod notify;
pub mod schedule;
pub mod storage;
pub mod sync;
pub mod text;
pub mod wizard;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError};
pub use engine::{Engine, EngineError, Output, Screen};
pub use model::{ContentScore, Evaluation, Report, Score, User, UserId};
pub use notify::{
    DedupKey, Notification, NotificationLedger, NotificationPolicy, NotificationScheduler,
    Notifier, NotifyError,
};
pub use schedule::{ScheduleError, ScheduleWindow};
pub use storage::{CatalogStore, MemoryStore, SqliteStore, StateStore, StorageError, create_storage};
pub use sync::{ReportSynchronizer, ScheduleNotice, SyncOutcome};
pub use wizard::{Action, Actor, Event, WizardState};

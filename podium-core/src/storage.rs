//! Storage abstraction for the catalog and wizard state.
//!
//! Provides the [`CatalogStore`] and [`StateStore`] traits as ports for
//! storage implementations, along with the error type, the SQLite adapter
//! and an in-process adapter.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, create_storage};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Evaluation, Report, User, UserId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A migration operation failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Invalid data was encountered.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Port for reports, users and evaluations.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All reports, ordered by start time then URL.
    async fn list_reports(&self) -> Result<Vec<Report>, StorageError>;

    async fn get_report(&self, url: &str) -> Result<Option<Report>, StorageError>;

    /// Insert or replace a report by URL.
    ///
    /// Returns `true` if the row was inserted or any field changed.
    async fn upsert_report(&self, report: &Report) -> Result<bool, StorageError>;

    /// Delete every report whose URL is not in `keep`.
    ///
    /// An empty `keep` deletes nothing. Evaluations and favorites that point
    /// at removed reports are left in place.
    ///
    /// # Returns
    ///
    /// The number of deleted reports.
    async fn delete_reports_not_in(&self, keep: &[String]) -> Result<u64, StorageError>;

    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Register the user if unknown, otherwise replace the identification.
    async fn set_identification(&self, id: UserId, identification: &str)
    -> Result<(), StorageError>;

    /// Returns `false` if the report was already a favorite or the user is
    /// not registered.
    async fn add_favorite(&self, id: UserId, url: &str) -> Result<bool, StorageError>;

    /// Returns `false` if the report was not a favorite.
    async fn remove_favorite(&self, id: UserId, url: &str) -> Result<bool, StorageError>;

    async fn get_evaluation(
        &self,
        id: UserId,
        url: &str,
    ) -> Result<Option<Evaluation>, StorageError>;

    /// Insert the evaluation, replacing any earlier one for the same pair.
    async fn save_evaluation(&self, evaluation: &Evaluation) -> Result<(), StorageError>;

    /// Overwrite an existing evaluation.
    ///
    /// Returns `true` only if a stored evaluation existed and differed.
    async fn update_evaluation(&self, evaluation: &Evaluation) -> Result<bool, StorageError>;

    /// Returns `true` if an evaluation existed.
    async fn delete_evaluation(&self, id: UserId, url: &str) -> Result<bool, StorageError>;

    async fn list_evaluations_by_user(&self, id: UserId) -> Result<Vec<Evaluation>, StorageError>;

    async fn list_all_evaluations(&self) -> Result<Vec<Evaluation>, StorageError>;
}

/// Port for the per-user wizard state string.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The stored state, or an empty string for unknown users.
    async fn get_state(&self, id: UserId) -> Result<String, StorageError>;

    async fn set_state(&self, id: UserId, state: &str) -> Result<(), StorageError>;
}

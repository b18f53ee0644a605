//! SQLite storage implementation.
//!
//! Provides [`SqliteStore`] as the default backend for both the catalog and
//! the wizard state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::model::{ContentScore, Evaluation, Report, Score, User, UserId};
use crate::storage::{CatalogStore, StateStore, StorageError};

#[cfg(test)]
mod tests;

/// Column format for report start times. Sorts lexicographically.
const STORED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-based catalog and state storage.
///
/// Uses connection pooling and WAL mode for performance.
/// Runs migrations automatically on startup.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SqliteStore from a database URL.
    ///
    /// The URL should be in the format `sqlite:path/to/database.db`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Database`] if connection fails.
    /// Returns [`StorageError::Migration`] if migrations fail.
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        let path = PathBuf::from(url);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Database(format!("failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(url)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))
    }

    fn format_time(time: NaiveDateTime) -> String {
        time.format(STORED_TIME_FORMAT).to_string()
    }

    fn parse_time(raw: &str) -> Result<NaiveDateTime, StorageError> {
        NaiveDateTime::parse_from_str(raw, STORED_TIME_FORMAT)
            .map_err(|e| StorageError::InvalidData(format!("invalid start time '{}': {}", raw, e)))
    }

    fn report_from_row(row: &SqliteRow) -> Result<Report, StorageError> {
        let start: String = row.get("start_time");
        let duration: i64 = row.get("duration_minutes");
        Ok(Report {
            url: row.get("url"),
            title: row.get("title"),
            speakers: row.get("speakers"),
            start_time: Self::parse_time(&start)?,
            duration_minutes: u32::try_from(duration).map_err(|_| {
                StorageError::InvalidData(format!("invalid duration: {}", duration))
            })?,
        })
    }

    fn evaluation_from_row(row: &SqliteRow) -> Result<Evaluation, StorageError> {
        let content: String = row.get("content");
        let performance: Option<i64> = row.get("performance");
        let performance = performance
            .map(|p| {
                u8::try_from(p)
                    .ok()
                    .and_then(Score::new)
                    .ok_or_else(|| StorageError::InvalidData(format!("invalid performance: {}", p)))
            })
            .transpose()?;
        Ok(Evaluation {
            user_id: row.get("user_id"),
            url: row.get("url"),
            content: ContentScore::decode(&content)
                .ok_or_else(|| StorageError::InvalidData(format!("invalid content: {}", content)))?,
            performance,
            comment: row.get("comment"),
        })
    }

    fn performance_value(evaluation: &Evaluation) -> Option<i64> {
        evaluation.performance.map(|p| i64::from(p.get()))
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn list_reports(&self) -> Result<Vec<Report>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT url, title, speakers, start_time, duration_minutes
            FROM reports
            ORDER BY start_time ASC, url ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.iter().map(Self::report_from_row).collect()
    }

    async fn get_report(&self, url: &str) -> Result<Option<Report>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT url, title, speakers, start_time, duration_minutes
            FROM reports
            WHERE url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        row.as_ref().map(Self::report_from_row).transpose()
    }

    async fn upsert_report(&self, report: &Report) -> Result<bool, StorageError> {
        // The WHERE clause turns an identical re-upload into a no-op, so
        // rows_affected only counts inserts and real changes.
        let result = sqlx::query(
            r#"
            INSERT INTO reports (url, title, speakers, start_time, duration_minutes)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                speakers = excluded.speakers,
                start_time = excluded.start_time,
                duration_minutes = excluded.duration_minutes
            WHERE reports.title IS NOT excluded.title
               OR reports.speakers IS NOT excluded.speakers
               OR reports.start_time IS NOT excluded.start_time
               OR reports.duration_minutes IS NOT excluded.duration_minutes
            "#,
        )
        .bind(&report.url)
        .bind(&report.title)
        .bind(&report.speakers)
        .bind(Self::format_time(report.start_time))
        .bind(i64::from(report.duration_minutes))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_reports_not_in(&self, keep: &[String]) -> Result<u64, StorageError> {
        if keep.is_empty() {
            return Ok(0);
        }
        let keep = serde_json::to_string(keep)
            .map_err(|e| StorageError::InvalidData(format!("cannot encode URL list: {}", e)))?;

        let result = sqlx::query(
            r#"
            DELETE FROM reports
            WHERE url NOT IN (SELECT value FROM json_each(?))
            "#,
        )
        .bind(keep)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows = sqlx::query("SELECT user_id, identification FROM users ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut users: BTreeMap<UserId, User> = rows
            .iter()
            .map(|row| {
                let id: i64 = row.get("user_id");
                (id, User::new(id, row.get::<String, _>("identification")))
            })
            .collect();

        let favorites = sqlx::query("SELECT user_id, url FROM favorites")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        for row in &favorites {
            let id: i64 = row.get("user_id");
            if let Some(user) = users.get_mut(&id) {
                user.favorites.insert(row.get("url"));
            }
        }

        Ok(users.into_values().collect())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query("SELECT identification FROM users WHERE user_id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut user = User::new(id, row.get::<String, _>("identification"));

        let favorites = sqlx::query("SELECT url FROM favorites WHERE user_id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        user.favorites = favorites.iter().map(|row| row.get("url")).collect();

        Ok(Some(user))
    }

    async fn set_identification(
        &self,
        id: UserId,
        identification: &str,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, identification, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET identification = excluded.identification
            "#,
        )
        .bind(id)
        .bind(identification)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn add_favorite(&self, id: UserId, url: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO favorites (user_id, url)
            SELECT ?, ? WHERE EXISTS (SELECT 1 FROM users WHERE user_id = ?)
            "#,
        )
        .bind(id)
        .bind(url)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_favorite(&self, id: UserId, url: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND url = ?")
            .bind(id)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_evaluation(
        &self,
        id: UserId,
        url: &str,
    ) -> Result<Option<Evaluation>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, url, content, performance, comment
            FROM evaluations
            WHERE user_id = ? AND url = ?
            "#,
        )
        .bind(id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        row.as_ref().map(Self::evaluation_from_row).transpose()
    }

    async fn save_evaluation(&self, evaluation: &Evaluation) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO evaluations (user_id, url, content, performance, comment)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, url) DO UPDATE SET
                content = excluded.content,
                performance = excluded.performance,
                comment = excluded.comment
            "#,
        )
        .bind(evaluation.user_id)
        .bind(&evaluation.url)
        .bind(evaluation.content.encode())
        .bind(Self::performance_value(evaluation))
        .bind(&evaluation.comment)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn update_evaluation(&self, evaluation: &Evaluation) -> Result<bool, StorageError> {
        let content = evaluation.content.encode();
        let performance = Self::performance_value(evaluation);
        let result = sqlx::query(
            r#"
            UPDATE evaluations
            SET content = ?, performance = ?, comment = ?
            WHERE user_id = ? AND url = ?
              AND (content IS NOT ? OR performance IS NOT ? OR comment IS NOT ?)
            "#,
        )
        .bind(&content)
        .bind(performance)
        .bind(&evaluation.comment)
        .bind(evaluation.user_id)
        .bind(&evaluation.url)
        .bind(&content)
        .bind(performance)
        .bind(&evaluation.comment)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_evaluation(&self, id: UserId, url: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM evaluations WHERE user_id = ? AND url = ?")
            .bind(id)
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_evaluations_by_user(&self, id: UserId) -> Result<Vec<Evaluation>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, url, content, performance, comment
            FROM evaluations
            WHERE user_id = ?
            ORDER BY url
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.iter().map(Self::evaluation_from_row).collect()
    }

    async fn list_all_evaluations(&self) -> Result<Vec<Evaluation>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, url, content, performance, comment
            FROM evaluations
            ORDER BY user_id, url
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        rows.iter().map(Self::evaluation_from_row).collect()
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get_state(&self, id: UserId) -> Result<String, StorageError> {
        let state: Option<String> =
            sqlx::query_scalar("SELECT state FROM wizard_states WHERE user_id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(state.unwrap_or_default())
    }

    async fn set_state(&self, id: UserId, state: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO wizard_states (user_id, state, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(state)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}

/// Create the default storage backend.
///
/// Uses `database_url` when given, otherwise `~/.config/podium/podium.db`.
///
/// # Errors
///
/// Returns [`StorageError::Database`] if the home directory cannot be
/// determined or the connection fails.
pub async fn create_storage(database_url: Option<&str>) -> Result<SqliteStore, StorageError> {
    let url = match database_url {
        Some(url) => url.to_string(),
        None => {
            let config_dir = dirs::home_dir()
                .ok_or_else(|| {
                    StorageError::Database("could not determine home directory".to_string())
                })?
                .join(".config/podium");

            format!("sqlite:{}", config_dir.join("podium.db").display())
        }
    };

    SqliteStore::new(&url).await
}

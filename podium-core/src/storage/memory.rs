//! In-process storage with the same semantics as the SQLite adapter.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{Evaluation, Report, User, UserId};
use crate::storage::{CatalogStore, StateStore, StorageError};

#[derive(Debug, Default)]
struct Tables {
    reports: HashMap<String, Report>,
    users: BTreeMap<UserId, User>,
    evaluations: BTreeMap<(UserId, String), Evaluation>,
    states: HashMap<UserId, String>,
}

/// Catalog and state store held in memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_reports(&self) -> Result<Vec<Report>, StorageError> {
        let tables = self.tables.read().await;
        let mut reports: Vec<Report> = tables.reports.values().cloned().collect();
        reports.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.url.cmp(&b.url))
        });
        Ok(reports)
    }

    async fn get_report(&self, url: &str) -> Result<Option<Report>, StorageError> {
        Ok(self.tables.read().await.reports.get(url).cloned())
    }

    async fn upsert_report(&self, report: &Report) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.reports.get(&report.url) == Some(report) {
            return Ok(false);
        }
        tables.reports.insert(report.url.clone(), report.clone());
        Ok(true)
    }

    async fn delete_reports_not_in(&self, keep: &[String]) -> Result<u64, StorageError> {
        if keep.is_empty() {
            return Ok(0);
        }
        let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let mut tables = self.tables.write().await;
        let before = tables.reports.len();
        tables.reports.retain(|url, _| keep.contains(url.as_str()));
        Ok((before - tables.reports.len()) as u64)
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn set_identification(
        &self,
        id: UserId,
        identification: &str,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        tables
            .users
            .entry(id)
            .or_insert_with(|| User::new(id, ""))
            .identification = identification.to_string();
        Ok(())
    }

    async fn add_favorite(&self, id: UserId, url: &str) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .get_mut(&id)
            .is_some_and(|user| user.favorites.insert(url.to_string())))
    }

    async fn remove_favorite(&self, id: UserId, url: &str) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .get_mut(&id)
            .is_some_and(|user| user.favorites.remove(url)))
    }

    async fn get_evaluation(
        &self,
        id: UserId,
        url: &str,
    ) -> Result<Option<Evaluation>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.evaluations.get(&(id, url.to_string())).cloned())
    }

    async fn save_evaluation(&self, evaluation: &Evaluation) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        tables.evaluations.insert(
            (evaluation.user_id, evaluation.url.clone()),
            evaluation.clone(),
        );
        Ok(())
    }

    async fn update_evaluation(&self, evaluation: &Evaluation) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        match tables
            .evaluations
            .get_mut(&(evaluation.user_id, evaluation.url.clone()))
        {
            Some(stored) if stored != evaluation => {
                *stored = evaluation.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_evaluation(&self, id: UserId, url: &str) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables.evaluations.remove(&(id, url.to_string())).is_some())
    }

    async fn list_evaluations_by_user(&self, id: UserId) -> Result<Vec<Evaluation>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .evaluations
            .values()
            .filter(|e| e.user_id == id)
            .cloned()
            .collect())
    }

    async fn list_all_evaluations(&self) -> Result<Vec<Evaluation>, StorageError> {
        Ok(self.tables.read().await.evaluations.values().cloned().collect())
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_state(&self, id: UserId) -> Result<String, StorageError> {
        Ok(self
            .tables
            .read()
            .await
            .states
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_state(&self, id: UserId, state: &str) -> Result<(), StorageError> {
        self.tables
            .write()
            .await
            .states
            .insert(id, state.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::Score;

    fn report(url: &str, hour: u32) -> Report {
        Report {
            url: url.to_string(),
            title: format!("Talk {url}"),
            speakers: "Ann".to_string(),
            start_time: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            duration_minutes: 30,
        }
    }

    #[tokio::test]
    async fn test_upsert_reports_change_detection() {
        let store = MemoryStore::new();
        let a = report("a", 10);
        assert!(store.upsert_report(&a).await.unwrap());
        assert!(!store.upsert_report(&a).await.unwrap());

        let mut moved = a.clone();
        moved.duration_minutes = 45;
        assert!(store.upsert_report(&moved).await.unwrap());
        assert_eq!(store.get_report("a").await.unwrap(), Some(moved));
    }

    #[tokio::test]
    async fn test_list_reports_sorted_by_start() {
        let store = MemoryStore::new();
        store.upsert_report(&report("late", 12)).await.unwrap();
        store.upsert_report(&report("early", 9)).await.unwrap();
        let urls: Vec<String> = store
            .list_reports()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(urls, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_delete_with_empty_keep_is_noop() {
        let store = MemoryStore::new();
        store.upsert_report(&report("a", 10)).await.unwrap();
        assert_eq!(store.delete_reports_not_in(&[]).await.unwrap(), 0);
        assert_eq!(
            store
                .delete_reports_not_in(&["b".to_string()])
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_evaluation_requires_existing_and_different() {
        let store = MemoryStore::new();
        let s = |v| Score::new(v).unwrap();
        let first = Evaluation::rated(1, "a", s(4), s(5), "great");
        assert!(!store.update_evaluation(&first).await.unwrap());

        store.save_evaluation(&first).await.unwrap();
        assert!(!store.update_evaluation(&first).await.unwrap());

        let edited = Evaluation::rated(1, "a", s(3), s(5), "");
        assert!(store.update_evaluation(&edited).await.unwrap());
        assert_eq!(store.get_evaluation(1, "a").await.unwrap(), Some(edited));
    }

    #[tokio::test]
    async fn test_state_defaults_to_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.get_state(9).await.unwrap(), "");
        store.set_state(9, "menu").await.unwrap();
        assert_eq!(store.get_state(9).await.unwrap(), "menu");
    }
}

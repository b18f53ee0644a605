use std::env::temp_dir;

use chrono::NaiveDate;
use uuid::Uuid;

use super::*;

/// Create a temporary database for testing.
async fn create_test_store() -> SqliteStore {
    let db_path = temp_dir().join(format!("podium_test_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}", db_path.display());
    SqliteStore::new(&url)
        .await
        .expect("failed to create test store")
}

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn report(url: &str, start: NaiveDateTime) -> Report {
    Report {
        url: url.to_string(),
        title: format!("Talk at {url}"),
        speakers: "Ann Lee".to_string(),
        start_time: start,
        duration_minutes: 30,
    }
}

fn score(v: u8) -> Score {
    Score::new(v).unwrap()
}

#[test]
fn test_time_format_round_trip() {
    let t = at(1, 9, 5);
    assert_eq!(SqliteStore::format_time(t), "2024-06-01 09:05:00");
    assert_eq!(SqliteStore::parse_time("2024-06-01 09:05:00").unwrap(), t);
    assert!(matches!(
        SqliteStore::parse_time("yesterday"),
        Err(StorageError::InvalidData(_))
    ));
}

#[tokio::test]
async fn test_upsert_reports_only_counts_changes() {
    let store = create_test_store().await;
    let a = report("https://conf/a", at(1, 10, 0));

    assert!(store.upsert_report(&a).await.unwrap());
    assert!(!store.upsert_report(&a).await.unwrap());

    let mut renamed = a.clone();
    renamed.title = "Renamed".to_string();
    assert!(store.upsert_report(&renamed).await.unwrap());

    let stored = store.get_report("https://conf/a").await.unwrap().unwrap();
    assert_eq!(stored, renamed);
}

#[tokio::test]
async fn test_list_reports_ordered_by_start() {
    let store = create_test_store().await;
    store
        .upsert_report(&report("https://conf/b", at(1, 11, 0)))
        .await
        .unwrap();
    store
        .upsert_report(&report("https://conf/a", at(1, 10, 0)))
        .await
        .unwrap();
    store
        .upsert_report(&report("https://conf/c", at(2, 9, 0)))
        .await
        .unwrap();

    let urls: Vec<String> = store
        .list_reports()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(
        urls,
        vec!["https://conf/a", "https://conf/b", "https://conf/c"]
    );
}

#[tokio::test]
async fn test_delete_reports_not_in_keeps_evaluations() {
    let store = create_test_store().await;
    store
        .upsert_report(&report("https://conf/a", at(1, 10, 0)))
        .await
        .unwrap();
    store
        .upsert_report(&report("https://conf/b", at(1, 11, 0)))
        .await
        .unwrap();
    store
        .save_evaluation(&Evaluation::rated(1, "https://conf/a", score(4), score(5), ""))
        .await
        .unwrap();

    assert_eq!(store.delete_reports_not_in(&[]).await.unwrap(), 0);
    let deleted = store
        .delete_reports_not_in(&["https://conf/b".to_string()])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(store.get_report("https://conf/a").await.unwrap().is_none());
    assert!(
        store
            .get_evaluation(1, "https://conf/a")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_users_and_favorites() {
    let store = create_test_store().await;
    assert!(store.get_user(7).await.unwrap().is_none());
    assert!(!store.add_favorite(7, "https://conf/a").await.unwrap());

    store.set_identification(7, "ann@example.com").await.unwrap();
    assert!(store.add_favorite(7, "https://conf/a").await.unwrap());
    assert!(!store.add_favorite(7, "https://conf/a").await.unwrap());

    store.set_identification(7, "Ann, ticket 12").await.unwrap();
    let user = store.get_user(7).await.unwrap().unwrap();
    assert_eq!(user.identification, "Ann, ticket 12");
    assert!(user.favorites.contains("https://conf/a"));

    store.set_identification(8, "Bob").await.unwrap();
    let users = store.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].favorites.len(), 1);
    assert!(users[1].favorites.is_empty());

    assert!(store.remove_favorite(7, "https://conf/a").await.unwrap());
    assert!(!store.remove_favorite(7, "https://conf/a").await.unwrap());
}

#[tokio::test]
async fn test_save_evaluation_replaces() {
    let store = create_test_store().await;
    let first = Evaluation::rated(1, "https://conf/a", score(2), score(3), "meh");
    store.save_evaluation(&first).await.unwrap();

    let second = Evaluation::opted_out(1, "https://conf/a", ContentScore::NotAttended);
    store.save_evaluation(&second).await.unwrap();

    let stored = store.get_evaluation(1, "https://conf/a").await.unwrap();
    assert_eq!(stored, Some(second));
    assert_eq!(store.list_all_evaluations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_evaluation_reports_change() {
    let store = create_test_store().await;
    let original = Evaluation::rated(1, "https://conf/a", score(4), score(5), "great");

    assert!(!store.update_evaluation(&original).await.unwrap());

    store.save_evaluation(&original).await.unwrap();
    let edited = Evaluation::rated(1, "https://conf/a", score(3), score(5), "");
    assert!(store.update_evaluation(&edited).await.unwrap());
    assert!(!store.update_evaluation(&edited).await.unwrap());

    let stored = store.get_evaluation(1, "https://conf/a").await.unwrap();
    assert_eq!(stored, Some(edited));
}

#[tokio::test]
async fn test_delete_evaluation() {
    let store = create_test_store().await;
    store
        .save_evaluation(&Evaluation::opted_out(
            1,
            "https://conf/a",
            ContentScore::Declined,
        ))
        .await
        .unwrap();
    store
        .save_evaluation(&Evaluation::rated(2, "https://conf/a", score(5), score(5), ""))
        .await
        .unwrap();

    assert_eq!(store.list_evaluations_by_user(1).await.unwrap().len(), 1);
    assert!(store.delete_evaluation(1, "https://conf/a").await.unwrap());
    assert!(!store.delete_evaluation(1, "https://conf/a").await.unwrap());
    assert!(store.list_evaluations_by_user(1).await.unwrap().is_empty());
    assert_eq!(store.list_all_evaluations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_wizard_state_round_trip() {
    let store = create_test_store().await;
    assert_eq!(store.get_state(5).await.unwrap(), "");

    store.set_state(5, "menu").await.unwrap();
    store
        .set_state(5, "evaluateReport;https://conf/a;Ann - Intro")
        .await
        .unwrap();
    assert_eq!(
        store.get_state(5).await.unwrap(),
        "evaluateReport;https://conf/a;Ann - Intro"
    );
}

#[tokio::test]
async fn test_create_storage_with_explicit_url() {
    let db_path = temp_dir().join(format!("podium_factory_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}", db_path.display());
    let store = create_storage(Some(&url)).await.unwrap();
    assert!(store.list_reports().await.unwrap().is_empty());
}

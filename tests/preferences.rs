//! Integration tests for preference persistence across database reopens.
//!
//! Each test works on its own file under the system temp directory so a
//! reopen sees exactly what the previous handle wrote.

use std::path::PathBuf;

use bytes_feed::preferences::{
    PreferenceError, PreferenceStore, ReadingDensity, Tone, UserPreferences, PREFERENCES_KEY,
};
use bytes_feed::storage::Database;
use pretty_assertions::assert_eq;

/// Temp database path removed (with its WAL side files) on drop.
struct TempDb(PathBuf);

impl TempDb {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "bytes-feed-{}-{}.db",
            name,
            std::process::id()
        ));
        let db = Self(path);
        db.cleanup();
        db
    }

    fn path(&self) -> &str {
        self.0.to_str().unwrap()
    }

    async fn store(&self) -> PreferenceStore {
        PreferenceStore::new(Database::open(self.path()).await.unwrap())
    }

    fn cleanup(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path(), suffix));
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[tokio::test]
async fn test_onboarding_survives_reopen() {
    let tmp = TempDb::new("reopen");

    let mut prefs = UserPreferences::with_topics(["AI & Tech", "Custom: SpaceX"]);
    prefs.display_name = Some("Sam".to_string());
    prefs.reading_density = ReadingDensity::DeepDives;
    prefs.tone = Tone::ContextAndOpinion;
    prefs.content_constraints.safe_mode = true;
    tmp.store().await.save(&prefs).await.unwrap();

    let loaded = tmp.store().await.load().await.unwrap();
    assert_eq!(loaded, Some(prefs));
}

#[tokio::test]
async fn test_first_run_has_no_preferences() {
    let tmp = TempDb::new("first-run");
    assert_eq!(tmp.store().await.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_topic_toggles_accumulate_across_reopens() {
    let tmp = TempDb::new("toggle");

    tmp.store().await.toggle_topic("Science").await.unwrap();
    tmp.store().await.toggle_topic("Climate").await.unwrap();
    let prefs = tmp.store().await.toggle_topic("science").await.unwrap();
    assert_eq!(prefs.topics, vec!["Climate".to_string()]);

    let reloaded = tmp.store().await.load().await.unwrap().unwrap();
    assert_eq!(reloaded.topics, vec!["Climate".to_string()]);
}

#[tokio::test]
async fn test_clear_then_reopen_starts_over() {
    let tmp = TempDb::new("clear");

    let store = tmp.store().await;
    store
        .save(&UserPreferences::with_topics(["World"]))
        .await
        .unwrap();
    assert!(store.clear().await.unwrap());
    assert!(!store.clear().await.unwrap());

    assert_eq!(tmp.store().await.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_corrupt_document_is_reported() {
    let tmp = TempDb::new("corrupt");
    let db = Database::open(tmp.path()).await.unwrap();
    db.set_preference(PREFERENCES_KEY, "{not json").await.unwrap();

    let result = PreferenceStore::new(db).load().await;
    assert!(matches!(result, Err(PreferenceError::Serialization(_))));
}

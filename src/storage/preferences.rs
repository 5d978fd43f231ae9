use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // User Preferences Operations
    // ========================================================================

    /// Get a single value by key, or `None` if the key was never written.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM user_preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a value (UPSERT), refreshing `updated_at` on conflict.
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a key. Returns true if a row was removed.
    pub async fn delete_preference(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_preference_missing() {
        let db = test_db().await;
        let value = db.get_preference("bytes_prefs").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_and_get_preference() {
        let db = test_db().await;
        db.set_preference("bytes_prefs", "{}").await.unwrap();

        let value = db.get_preference("bytes_prefs").await.unwrap();
        assert_eq!(value, Some("{}".to_string()));
    }

    #[tokio::test]
    async fn test_set_preference_upsert() {
        let db = test_db().await;
        db.set_preference("bytes_prefs", "a").await.unwrap();
        db.set_preference("bytes_prefs", "b").await.unwrap();

        let value = db.get_preference("bytes_prefs").await.unwrap();
        assert_eq!(value, Some("b".to_string()));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_preferences")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_delete_preference() {
        let db = test_db().await;
        db.set_preference("bytes_prefs", "x").await.unwrap();

        assert!(db.delete_preference("bytes_prefs").await.unwrap());
        assert!(!db.delete_preference("bytes_prefs").await.unwrap());
        assert_eq!(db.get_preference("bytes_prefs").await.unwrap(), None);
    }
}

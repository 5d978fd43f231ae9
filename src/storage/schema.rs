use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

/// Handle to the local SQLite key-value store.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// Pass `":memory:"` for an ephemeral store (tests, `--no-persist`).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another process holds the
    /// database lock, `DatabaseError::Migration` if the schema could not be
    /// created, and `DatabaseError::Other` for anything else.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Pre-create the file user-only so it never exists with umask permissions.
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let db_path = std::path::Path::new(path);
            if db_path.exists() {
                let perms = std::fs::Permissions::from_mode(0o600);
                if let Err(e) = std::fs::set_permissions(path, perms) {
                    tracing::warn!(path = %path, error = %e, "Failed to set database file permissions");
                }
            } else if db_path.parent().is_some_and(|p| p.exists()) {
                let _file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .mode(0o600)
                    .open(db_path)
                    .ok(); // SQLite reports the real error at connect time.
            }
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");

        // Preference traffic is tiny: one read at startup, one write per change.
        // An in-memory database lives and dies with its single connection.
        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10));
        if path == ":memory:" {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            let msg = e.to_string().to_lowercase();
            if msg.contains("database is locked") || msg.contains("sqlite_busy") {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Create the schema. Idempotent: every statement uses `IF NOT EXISTS`.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Key-value store for the onboarding result and later edits.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::open(":memory:").await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_preferences")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_rows() {
        let dir = std::env::temp_dir().join("bytes_db_test_reopen");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bytes.db");
        let _ = std::fs::remove_file(&path);
        let path_str = path.to_str().unwrap();

        {
            let db = Database::open(path_str).await.unwrap();
            db.set_preference("k", "v").await.unwrap();
            db.pool.close().await;
        }

        let db = Database::open(path_str).await.unwrap();
        assert_eq!(db.get_preference("k").await.unwrap().as_deref(), Some("v"));
        db.pool.close().await;

        std::fs::remove_dir_all(&dir).ok();
    }
}

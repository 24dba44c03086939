//! SQLite persistence for user preferences
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Values arrive already sealed by the preference store; this layer only sees
//! opaque blobs.

use crate::features::secrets::{PreferenceBackend, StorageError};
use anyhow::Result;
use async_trait::async_trait;
use log::info;
use sqlite::{Connection, State};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists
    pub async fn new(database_path: &str) -> Result<Self> {
        let connection = sqlite::open(database_path)?;
        let db = Database {
            connection: Arc::new(Mutex::new(connection)),
        };
        db.init_tables().await?;
        info!("💾 Database ready at {database_path}");
        Ok(db)
    }

    async fn init_tables(&self) -> Result<()> {
        let conn = self.connection.lock().await;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_prefs (
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, name)
            )",
        )?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_user_prefs_name ON user_prefs(name)")?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceBackend for Database {
    async fn get_preference(
        &self,
        subject: &str,
        name: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare("SELECT value FROM user_prefs WHERE user_id = ? AND name = ?")?;
        statement.bind((1, subject))?;
        statement.bind((2, name))?;

        if let State::Row = statement.next()? {
            Ok(Some(statement.read::<Vec<u8>, _>(0)?))
        } else {
            Ok(None)
        }
    }

    async fn upsert_preference(
        &self,
        subject: &str,
        name: &str,
        value: &[u8],
    ) -> Result<(), StorageError> {
        let updated_at = chrono::Utc::now().to_rfc3339();
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare(
            "INSERT OR REPLACE INTO user_prefs (user_id, name, value, updated_at)
             VALUES (?, ?, ?, ?)",
        )?;
        statement.bind((1, subject))?;
        statement.bind((2, name))?;
        statement.bind((3, value))?;
        statement.bind((4, updated_at.as_str()))?;
        statement.next()?;
        Ok(())
    }

    async fn delete_preference(&self, subject: &str, name: &str) -> Result<(), StorageError> {
        let conn = self.connection.lock().await;
        let mut statement = conn.prepare("DELETE FROM user_prefs WHERE user_id = ? AND name = ?")?;
        statement.bind((1, subject))?;
        statement.bind((2, name))?;
        statement.next()?;
        Ok(())
    }

    async fn subjects_with(&self, name: &str) -> Result<Vec<String>, StorageError> {
        let conn = self.connection.lock().await;
        let mut statement =
            conn.prepare("SELECT user_id FROM user_prefs WHERE name = ? ORDER BY user_id")?;
        statement.bind((1, name))?;

        let mut subjects = Vec::new();
        while let State::Row = statement.next()? {
            subjects.push(statement.read::<String, _>(0)?);
        }
        Ok(subjects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (_dir, db) = test_db().await;

        db.upsert_preference("U1", "rat_cookie", &[1, 2, 3]).await.unwrap();
        assert_eq!(
            db.get_preference("U1", "rat_cookie").await.unwrap(),
            Some(vec![1, 2, 3])
        );

        db.upsert_preference("U1", "rat_cookie", &[9]).await.unwrap();
        assert_eq!(db.get_preference("U1", "rat_cookie").await.unwrap(), Some(vec![9]));
    }

    #[tokio::test]
    async fn test_missing_row_is_none() {
        let (_dir, db) = test_db().await;
        assert_eq!(db.get_preference("U1", "rat_cookie").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_ok() {
        let (_dir, db) = test_db().await;

        db.delete_preference("U1", "rat_cookie").await.unwrap();
        db.upsert_preference("U1", "rat_cookie", &[1]).await.unwrap();
        db.delete_preference("U1", "rat_cookie").await.unwrap();
        assert_eq!(db.get_preference("U1", "rat_cookie").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_subjects_with() {
        let (_dir, db) = test_db().await;
        db.upsert_preference("U2", "rat_cookie", &[1]).await.unwrap();
        db.upsert_preference("U1", "rat_cookie", &[1]).await.unwrap();
        db.upsert_preference("U3", "failed_rat_tries", &[1]).await.unwrap();

        assert_eq!(db.subjects_with("rat_cookie").await.unwrap(), vec!["U1", "U2"]);
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.db");
        let path = path.to_str().unwrap();

        Database::new(path)
            .await
            .unwrap()
            .upsert_preference("U1", "rat_cookie", &[7, 7])
            .await
            .unwrap();

        let reopened = Database::new(path).await.unwrap();
        assert_eq!(
            reopened.get_preference("U1", "rat_cookie").await.unwrap(),
            Some(vec![7, 7])
        );
    }
}

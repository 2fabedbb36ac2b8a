// Storage module - credential persistence
//
// The orchestrator only sees the `CredentialStore` trait; callers pick
// the in-memory store or the SQLite-backed one.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::RwLock;

use crate::core::{Credential, PlatformId, PublishError};

/// Credential persistence boundary, keyed by (user, platform)
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(
        &self,
        user_id: &str,
        platform: PlatformId,
    ) -> Result<Option<Credential>, PublishError>;

    async fn put(&self, credential: &Credential) -> Result<(), PublishError>;

    /// Returns true when a credential was actually removed
    async fn delete(&self, user_id: &str, platform: PlatformId) -> Result<bool, PublishError>;
}

/// In-memory credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<HashMap<(String, PlatformId), Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(
        &self,
        user_id: &str,
        platform: PlatformId,
    ) -> Result<Option<Credential>, PublishError> {
        let credentials = self.credentials.read().await;
        Ok(credentials.get(&(user_id.to_string(), platform)).cloned())
    }

    async fn put(&self, credential: &Credential) -> Result<(), PublishError> {
        let mut credentials = self.credentials.write().await;
        credentials.insert(
            (credential.user_id.clone(), credential.platform),
            credential.clone(),
        );
        Ok(())
    }

    async fn delete(&self, user_id: &str, platform: PlatformId) -> Result<bool, PublishError> {
        let mut credentials = self.credentials.write().await;
        Ok(credentials.remove(&(user_id.to_string(), platform)).is_some())
    }
}

/// SQLite-backed credential store
///
/// One row per (user, platform); metadata is stored as a JSON string,
/// timestamps as RFC 3339.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    /// Base path for database files
    base_path: PathBuf,
}

impl SqliteCredentialStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn get_db_path(&self) -> PathBuf {
        self.base_path.join("matrix.db")
    }

    /// Get or create connection
    fn get_connection(&self) -> Result<Connection, PublishError> {
        let db_path = self.get_db_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(&db_path)?;
        self.initialize_schema(&conn)?;
        Ok(conn)
    }

    fn initialize_schema(&self, conn: &Connection) -> Result<(), PublishError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                user_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                expires_at TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, platform)
            )
        "#,
            [],
        )?;
        Ok(())
    }

    fn row_to_credential(row: &rusqlite::Row<'_>) -> rusqlite::Result<Credential> {
        let user_id: String = row.get(0)?;
        let platform: String = row.get(1)?;
        let access_token: String = row.get(2)?;
        let refresh_token: Option<String> = row.get(3)?;
        let expires_at: String = row.get(4)?;
        let metadata: String = row.get(5)?;

        Ok(Credential {
            user_id,
            // Unknown rows cannot exist: platform is written from the enum
            platform: PlatformId::parse(&platform).unwrap_or(PlatformId::YouTube),
            access_token,
            refresh_token,
            expires_at: expires_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
            metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get(
        &self,
        user_id: &str,
        platform: PlatformId,
    ) -> Result<Option<Credential>, PublishError> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, platform, access_token, refresh_token, expires_at, metadata
             FROM credentials WHERE user_id = ? AND platform = ?",
        )?;

        match stmt.query_row([user_id, platform.as_str()], Self::row_to_credential) {
            Ok(credential) => Ok(Some(credential)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, credential: &Credential) -> Result<(), PublishError> {
        let conn = self.get_connection()?;
        let metadata = serde_json::to_string(&credential.metadata)
            .map_err(|e| PublishError::StorageError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO credentials (
                user_id, platform, access_token, refresh_token, expires_at, metadata, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
            rusqlite::params![
                credential.user_id,
                credential.platform.as_str(),
                credential.access_token,
                credential.refresh_token,
                credential.expires_at.to_rfc3339(),
                metadata,
            ],
        )?;

        Ok(())
    }

    async fn delete(&self, user_id: &str, platform: PlatformId) -> Result<bool, PublishError> {
        let conn = self.get_connection()?;
        let rows = conn.execute(
            "DELETE FROM credentials WHERE user_id = ? AND platform = ?",
            [user_id, platform.as_str()],
        )?;
        Ok(rows > 0)
    }
}

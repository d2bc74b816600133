// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`SessionStore`] trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use delve_config::model::StorageConfig;
use delve_core::{
    AdapterType, ChatMessage, ChatSession, DelveError, HealthStatus, MessageId, MessagePatch,
    PluginAdapter, SessionId, SessionStore, UserId,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed session store.
///
/// The database is opened lazily by [`SessionStore::initialize`]; every
/// other operation fails with a storage error until then.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the configured path without touching the disk.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, DelveError> {
        self.db
            .get()
            .ok_or_else(|| DelveError::storage("store not initialized; call initialize() first"))
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, DelveError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DelveError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn initialize(&self) -> Result<(), DelveError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| DelveError::storage("store already initialized"))?;
        debug!(path = %self.config.database_path, "sqlite session store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), DelveError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<ChatSession>, DelveError> {
        queries::sessions::list_sessions_for_user(self.db()?, user_id.as_str()).await
    }

    async fn create_session(&self, session: &ChatSession) -> Result<(), DelveError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn rename_session(&self, id: &SessionId, name: &str) -> Result<(), DelveError> {
        let changed = queries::sessions::rename_session(self.db()?, id.as_str(), name).await?;
        if changed == 0 {
            return Err(DelveError::NotFound {
                kind: "session",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, DelveError> {
        queries::messages::get_messages_for_session(self.db()?, session_id.as_str()).await
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), DelveError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn update_message(
        &self,
        id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<(), DelveError> {
        if patch.is_empty() {
            return Ok(());
        }
        queries::messages::update_message(self.db()?, id.as_str(), patch).await
    }
}

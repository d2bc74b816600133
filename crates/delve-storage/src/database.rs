// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread; the
//! [`Database`] handle is the only writer. Do NOT create additional
//! Connection instances for writes.

use std::path::Path;

use delve_core::DelveError;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database backing the session store.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode and
    /// applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, DelveError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, DelveError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(DelveError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| DelveError::storage(e.to_string()))?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, DelveError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| DelveError::storage(e.to_string()))?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    /// The underlying connection; every query goes through its `call`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), DelveError> {
        self.checkpoint().await?;
        self.conn
            .close()
            .await
            .map_err(|e| DelveError::storage(e.to_string()))
    }

    /// Folds the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), DelveError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), DelveError> {
        self.conn
            .call(move |conn| -> Result<Result<(), DelveError>, rusqlite::Error> {
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
                if wal_mode {
                    let mode: String =
                        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                    debug!(journal_mode = %mode, "journal mode set");
                }
                Ok(migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
    }
}

/// Converts a tokio-rusqlite error into a storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> DelveError {
    DelveError::Storage {
        source: Box::new(e),
    }
}

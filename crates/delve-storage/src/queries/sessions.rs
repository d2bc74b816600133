// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session CRUD operations.

use delve_core::{ChatSession, DelveError};
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ChatSession> {
    Ok(ChatSession {
        id: row.get::<_, String>(0)?.into(),
        user_id: row.get::<_, String>(1)?.into(),
        created_at: row.get(2)?,
        session_name: row.get(3)?,
    })
}

/// Insert a new session.
pub async fn create_session(db: &Database, session: &ChatSession) -> Result<(), DelveError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO chat_sessions (id, user_id, created_at, session_name)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    session.id.as_str(),
                    session.user_id.as_str(),
                    session.created_at,
                    session.session_name,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<ChatSession>, DelveError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ChatSession>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT id, user_id, created_at, session_name
                 FROM chat_sessions WHERE id = ?1",
                params![id],
                session_from_row,
            );
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List a user's sessions, newest first.
pub async fn list_sessions_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<ChatSession>, DelveError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ChatSession>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, created_at, session_name
                 FROM chat_sessions WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map(params![user_id], session_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Rename a session. Returns the number of rows changed (0 or 1).
pub async fn rename_session(db: &Database, id: &str, name: &str) -> Result<usize, DelveError> {
    let id = id.to_string();
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE chat_sessions SET session_name = ?1 WHERE id = ?2",
                params![name, id],
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_session(id: &str, user: &str, created_at: &str) -> ChatSession {
        ChatSession {
            id: id.into(),
            user_id: user.into(),
            created_at: created_at.to_string(),
            session_name: "New Chat".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_session_roundtrips() {
        let (db, _dir) = setup_db().await;
        let session = make_session("sess-1", "user-1", "2026-01-01T00:00:00.000Z");

        create_session(&db, &session).await.unwrap();
        let retrieved = get_session(&db, "sess-1").await.unwrap().unwrap();
        assert_eq!(retrieved, session);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_session_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_session(&db, "no-such-session").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_is_scoped_to_user_and_newest_first() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("old", "alice", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        create_session(&db, &make_session("new", "alice", "2026-01-02T00:00:00.000Z"))
            .await
            .unwrap();
        create_session(&db, &make_session("other", "bob", "2026-01-03T00:00:00.000Z"))
            .await
            .unwrap();

        let sessions = list_sessions_for_user(&db, "alice").await.unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn rename_changes_only_the_name() {
        let (db, _dir) = setup_db().await;
        let session = make_session("s-ren", "alice", "2026-01-01T00:00:00.000Z");
        create_session(&db, &session).await.unwrap();

        assert_eq!(rename_session(&db, "s-ren", "Quantum...").await.unwrap(), 1);
        assert_eq!(rename_session(&db, "missing", "x").await.unwrap(), 0);

        let retrieved = get_session(&db, "s-ren").await.unwrap().unwrap();
        assert_eq!(retrieved.session_name, "Quantum...");
        assert_eq!(retrieved.created_at, session.created_at);
        db.close().await.unwrap();
    }
}

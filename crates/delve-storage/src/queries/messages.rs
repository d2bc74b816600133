// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat message CRUD operations.
//!
//! `response_data` and `fetched_links` hold JSON documents; `stage` holds the
//! camelCase stage name.

use std::str::FromStr;

use delve_core::{ChatMessage, DelveError, MessagePatch, Stage};
use rusqlite::types::Type;
use rusqlite::{Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::database::{Database, map_tr_err};

fn to_json<T: Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let stage: String = row.get(7)?;
    let stage = Stage::from_str(&stage)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
    Ok(ChatMessage {
        id: row.get::<_, String>(0)?.into(),
        session_id: row.get::<_, String>(1)?.into(),
        user_id: row.get::<_, String>(2)?.into(),
        query: row.get(3)?,
        response: json_column(row, 4)?,
        fetched_links: json_column(row, 5)?,
        error: row.get(6)?,
        stage,
        created_at: row.get(8)?,
    })
}

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &ChatMessage) -> Result<(), DelveError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let response = msg.response.as_ref().map(to_json).transpose()?;
            let links = msg.fetched_links.as_ref().map(to_json).transpose()?;
            conn.execute(
                "INSERT INTO chat_messages
                   (id, session_id, user_id, query_text, response_data, fetched_links,
                    error_text, stage, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    msg.id.as_str(),
                    msg.session_id.as_str(),
                    msg.user_id.as_str(),
                    msg.query,
                    response,
                    links,
                    msg.error,
                    msg.stage.to_string(),
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get messages for a session in chronological order.
pub async fn get_messages_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Vec<ChatMessage>, DelveError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ChatMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, user_id, query_text, response_data, fetched_links,
                        error_text, stage, created_at
                 FROM chat_messages WHERE session_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![session_id], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply `patch` to the message `id`. Absent fields keep their stored value.
pub async fn update_message(
    db: &Database,
    id: &str,
    patch: &MessagePatch,
) -> Result<(), DelveError> {
    let id = id.to_string();
    let patch = patch.clone();
    let changed = db
        .connection()
        .call({
            let id = id.clone();
            move |conn| -> Result<usize, rusqlite::Error> {
                let response = patch.response.as_ref().map(to_json).transpose()?;
                let links = patch.fetched_links.as_ref().map(to_json).transpose()?;
                conn.execute(
                    "UPDATE chat_messages SET
                       stage = COALESCE(?1, stage),
                       fetched_links = COALESCE(?2, fetched_links),
                       response_data = COALESCE(?3, response_data),
                       error_text = COALESCE(?4, error_text)
                     WHERE id = ?5",
                    params![
                        patch.stage.map(|s| s.to_string()),
                        links,
                        response,
                        patch.error,
                        id,
                    ],
                )
            }
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(DelveError::NotFound { kind: "message", id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions;
    use delve_core::{AiResponse, ChatSession, FetchedLinks, SearchResultItem};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        sessions::create_session(
            &db,
            &ChatSession {
                id: "sess-1".into(),
                user_id: "user-1".into(),
                created_at: "2026-01-01T00:00:00.000Z".into(),
                session_name: "New Chat".into(),
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    fn make_message(id: &str, created_at: &str) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            session_id: "sess-1".into(),
            user_id: "user-1".into(),
            query: "What is quantum entanglement?".into(),
            response: None,
            fetched_links: None,
            error: None,
            stage: Stage::FetchingLinks,
            created_at: created_at.into(),
        }
    }

    fn sample_links() -> FetchedLinks {
        FetchedLinks {
            query: "What is quantum entanglement?".into(),
            results: vec![SearchResultItem {
                title: "Entanglement".into(),
                url: "https://physics.example/entanglement".into(),
                content: None,
            }],
            total_results: Some(1),
        }
    }

    #[tokio::test]
    async fn messages_list_oldest_first() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &make_message("m2", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();
        insert_message(&db, &make_message("m1", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();

        let messages = get_messages_for_session(&db, "sess-1").await.unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert!(messages[0].response.is_none());
        assert_eq!(messages[0].stage, Stage::FetchingLinks);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn patches_accumulate_without_clobbering() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &make_message("m1", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();

        update_message(&db, "m1", &MessagePatch::links(sample_links()))
            .await
            .unwrap();
        let response = AiResponse {
            final_answer: vec!["Two particles share one state [Source 1].".into()],
            sources: vec!["https://physics.example/entanglement".into()],
            ..AiResponse::default()
        };
        update_message(&db, "m1", &MessagePatch::response(response.clone()))
            .await
            .unwrap();
        update_message(&db, "m1", &MessagePatch::stage(Stage::Final))
            .await
            .unwrap();

        let stored = &get_messages_for_session(&db, "sess-1").await.unwrap()[0];
        assert_eq!(stored.fetched_links, Some(sample_links()));
        assert_eq!(stored.response, Some(response));
        assert_eq!(stored.stage, Stage::Final);
        assert_eq!(stored.error, None);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failure_patch_records_error_text() {
        let (db, _dir) = setup_db().await;
        insert_message(&db, &make_message("m1", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        update_message(&db, "m1", &MessagePatch::failed("upstream timeout"))
            .await
            .unwrap();

        let stored = &get_messages_for_session(&db, "sess-1").await.unwrap()[0];
        assert_eq!(stored.stage, Stage::Error);
        assert_eq!(stored.error.as_deref(), Some("upstream timeout"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn updating_unknown_message_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = update_message(&db, "ghost", &MessagePatch::stage(Stage::Final))
            .await
            .unwrap_err();
        assert!(matches!(err, DelveError::NotFound { kind: "message", .. }));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn message_requires_existing_session() {
        let (db, _dir) = setup_db().await;
        let mut orphan = make_message("m1", "2026-01-01T00:00:01.000Z");
        orphan.session_id = "no-such-session".into();
        let err = insert_message(&db, &orphan).await.unwrap_err();
        assert!(matches!(err, DelveError::Storage { .. }));
        db.close().await.unwrap();
    }
}

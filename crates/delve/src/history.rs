// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `delve sessions` and `delve history` command implementations.
//!
//! Both read the store directly; no backend connection is needed.

use delve_agent::reconstruct_historical;
use delve_config::DelveConfig;
use delve_core::{ChatMessage, DelveError, SessionId, UserId};

use crate::app::open_store;
use crate::render;

/// Lists the configured user's chat sessions, newest first.
pub async fn run_sessions(config: &DelveConfig, json: bool) -> Result<(), DelveError> {
    let store = open_store(config).await?;
    let sessions = store
        .list_sessions(&UserId::from(config.app.user_id.as_str()))
        .await?;
    store.close().await?;

    if json {
        println!("{}", to_json(&sessions)?);
    } else {
        for line in render::session_lines(&sessions, None) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Prints the stored exchanges of one session, oldest first.
pub async fn run_history(
    config: &DelveConfig,
    session_id: &str,
    json: bool,
) -> Result<(), DelveError> {
    let store = open_store(config).await?;
    let session_id = SessionId::from(session_id);
    let user = UserId::from(config.app.user_id.as_str());

    let owned = store
        .list_sessions(&user)
        .await?
        .iter()
        .any(|s| s.id == session_id);
    if !owned {
        store.close().await?;
        return Err(DelveError::NotFound {
            kind: "session",
            id: session_id.to_string(),
        });
    }

    let messages: Vec<ChatMessage> = store
        .list_messages(&session_id)
        .await?
        .into_iter()
        .map(reconstruct_historical)
        .collect();
    store.close().await?;

    if json {
        println!("{}", to_json(&messages)?);
    } else {
        for message in &messages {
            for line in render::message_lines(message) {
                println!("{line}");
            }
            println!();
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DelveError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DelveError::Internal(format!("failed to encode output: {e}")))
}

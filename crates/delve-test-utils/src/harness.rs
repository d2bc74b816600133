// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a running assistant over a temp SQLite database
//! and a research backend (the [`MockBackend`] unless another one is
//! supplied). Provides `ask()` to drive one query to completion.

use std::sync::Arc;
use std::time::Duration;

use delve_agent::{Assistant, AssistantConfig, AssistantHandle, Pacing, StageEvent};
use delve_config::model::StorageConfig;
use delve_core::types::AuthUser;
use delve_core::{ChatMessage, DelveError, MessageId, ResearchBackend, SessionStore};
use delve_storage::SqliteStore;
use tokio::sync::broadcast;

use crate::mock_backend::MockBackend;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    backend: Option<Arc<dyn ResearchBackend>>,
    pacing: Pacing,
    user: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: None,
            pacing: Pacing {
                link_reveal: Duration::from_millis(1),
                stage_dwell: Duration::from_millis(1),
            },
            user: Some("test-user".to_string()),
        }
    }

    /// Use `backend` instead of the mock backend.
    pub fn with_backend(mut self, backend: Arc<dyn ResearchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the presentation delays.
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Start without a signed-in user.
    pub fn signed_out(mut self) -> Self {
        self.user = None;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, DelveError> {
        let temp_dir = tempfile::TempDir::new().map_err(DelveError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let store = SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        store.initialize().await?;
        let store: Arc<dyn SessionStore> = Arc::new(store);

        let mock_backend = Arc::new(MockBackend::new());
        let backend = self
            .backend
            .unwrap_or_else(|| mock_backend.clone() as Arc<dyn ResearchBackend>);

        let config = AssistantConfig {
            pacing: self.pacing,
            ..AssistantConfig::default()
        };
        let assistant = Assistant::spawn(config, store.clone(), backend);
        if let Some(user) = self.user {
            assistant
                .sign_in(AuthUser {
                    id: user.into(),
                    email: None,
                })
                .await?;
        }

        Ok(TestHarness {
            assistant,
            mock_backend,
            store,
            _temp_dir: temp_dir,
        })
    }
}

/// A running assistant over temp storage.
pub struct TestHarness {
    /// Handle to the running assistant.
    pub assistant: AssistantHandle,
    /// The mock backend; unused when another backend was supplied.
    pub mock_backend: Arc<MockBackend>,
    /// SQLite store (temp DB, cleaned up on drop).
    pub store: Arc<dyn SessionStore>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Submit `query` and collect its stage events up to the terminal one.
    ///
    /// Returns the events and the message as the view last showed it.
    pub async fn ask(&self, query: &str) -> Result<(Vec<StageEvent>, ChatMessage), DelveError> {
        let mut events = self.assistant.subscribe();
        let ticket = self.assistant.submit(query).await?;
        let collected = collect_until_terminal(&mut events, &ticket.message_id).await?;
        let message = self
            .assistant
            .view()
            .message(&ticket.message_id)
            .cloned()
            .ok_or_else(|| DelveError::NotFound {
                kind: "message",
                id: ticket.message_id.to_string(),
            })?;
        Ok((collected, message))
    }
}

/// Reads events for `message_id` until its terminal event arrives.
pub async fn collect_until_terminal(
    events: &mut broadcast::Receiver<StageEvent>,
    message_id: &MessageId,
) -> Result<Vec<StageEvent>, DelveError> {
    let mut collected = Vec::new();
    loop {
        let event = events
            .recv()
            .await
            .map_err(|e| DelveError::Internal(format!("event stream ended: {e}")))?;
        if event.message_id() != message_id {
            continue;
        }
        let terminal = event.is_terminal();
        collected.push(event);
        if terminal {
            return Ok(collected);
        }
    }
}

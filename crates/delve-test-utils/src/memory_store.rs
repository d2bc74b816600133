// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session store for deterministic testing.
//!
//! `MemoryStore` implements `SessionStore` with the same ordering and
//! not-found semantics as the SQLite store, plus per-operation fault
//! injection and call counting for assertions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use delve_core::traits::adapter::PluginAdapter;
use delve_core::traits::store::SessionStore;
use delve_core::types::{
    AdapterType, ChatMessage, ChatSession, HealthStatus, MessageId, MessagePatch, SessionId,
    UserId,
};
use delve_core::DelveError;

/// A store operation, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListSessions,
    CreateSession,
    RenameSession,
    ListMessages,
    InsertMessage,
    UpdateMessage,
}

#[derive(Default)]
struct State {
    sessions: Vec<ChatSession>,
    messages: Vec<ChatMessage>,
    failing: HashSet<StoreOp>,
    calls: HashMap<StoreOp, usize>,
}

/// A session store held entirely in memory.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Make every later call of `op` fail with a storage error.
    pub async fn fail_on(&self, op: StoreOp) {
        self.state.lock().await.failing.insert(op);
    }

    /// Stop failing every operation.
    pub async fn heal(&self) {
        self.state.lock().await.failing.clear();
    }

    /// Number of calls made to `op`, failed ones included.
    pub async fn call_count(&self, op: StoreOp) -> usize {
        self.state.lock().await.calls.get(&op).copied().unwrap_or(0)
    }

    /// All stored sessions in insertion order.
    pub async fn sessions_snapshot(&self) -> Vec<ChatSession> {
        self.state.lock().await.sessions.clone()
    }

    /// All stored messages in insertion order.
    pub async fn messages_snapshot(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    /// Records the call and returns the guarded state, or the injected fault.
    async fn enter(&self, op: StoreOp) -> Result<tokio::sync::MutexGuard<'_, State>, DelveError> {
        let mut state = self.state.lock().await;
        *state.calls.entry(op).or_default() += 1;
        if state.failing.contains(&op) {
            return Err(DelveError::storage(format!("injected failure on {op:?}")));
        }
        Ok(state)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, DelveError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DelveError> {
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn initialize(&self) -> Result<(), DelveError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), DelveError> {
        Ok(())
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<ChatSession>, DelveError> {
        let state = self.enter(StoreOp::ListSessions).await?;
        // Newest first; later inserts win ties.
        let mut sessions: Vec<ChatSession> = state
            .sessions
            .iter()
            .rev()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn create_session(&self, session: &ChatSession) -> Result<(), DelveError> {
        let mut state = self.enter(StoreOp::CreateSession).await?;
        if state.sessions.iter().any(|s| s.id == session.id) {
            return Err(DelveError::storage(format!(
                "duplicate session id {}",
                session.id
            )));
        }
        state.sessions.push(session.clone());
        Ok(())
    }

    async fn rename_session(&self, id: &SessionId, name: &str) -> Result<(), DelveError> {
        let mut state = self.enter(StoreOp::RenameSession).await?;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| DelveError::NotFound {
                kind: "session",
                id: id.to_string(),
            })?;
        session.session_name = name.to_string();
        Ok(())
    }

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, DelveError> {
        let state = self.enter(StoreOp::ListMessages).await?;
        let mut messages: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|m| &m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), DelveError> {
        let mut state = self.enter(StoreOp::InsertMessage).await?;
        if !state.sessions.iter().any(|s| s.id == message.session_id) {
            return Err(DelveError::NotFound {
                kind: "session",
                id: message.session_id.to_string(),
            });
        }
        state.messages.push(message.clone());
        Ok(())
    }

    async fn update_message(&self, id: &MessageId, patch: &MessagePatch) -> Result<(), DelveError> {
        let mut state = self.enter(StoreOp::UpdateMessage).await?;
        if patch.is_empty() {
            return Ok(());
        }
        let message = state
            .messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| DelveError::NotFound {
                kind: "message",
                id: id.to_string(),
            })?;
        patch.apply_to(message);
        Ok(())
    }
}

// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session manager: the signed-in user, their chat sessions, and which one
//! is active.
//!
//! Owned by the assistant actor. Cancelling in-flight work on a context
//! change is the actor's job; this type only keeps the session list and
//! the store consistent.

use std::sync::Arc;

use delve_core::{
    ChatMessage, ChatSession, DelveError, SessionId, SessionStore, Stage, UserId,
    ValidationError,
};
use tracing::{debug, info, warn};

/// Ellipsis appended to truncated session names.
const ELLIPSIS: &str = "...";

/// Names a session after a query, capped at `max_chars` characters.
///
/// Longer queries keep their first `max_chars - 3` characters, minus trailing
/// whitespace, followed by `...`.
pub fn truncate_name(query: &str, max_chars: usize) -> String {
    let query = query.trim();
    if query.chars().count() <= max_chars {
        return query.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let head: String = query.chars().take(keep).collect();
    format!("{}{ELLIPSIS}", head.trim_end())
}

/// Rebuilds a stored row for display.
///
/// Failures stay failures and rows with an answer are completed exchanges.
/// A row whose run was abandoned before the answer arrived keeps its stored
/// stage, so it reads as pending-but-unresolved rather than as an empty
/// answer.
pub fn reconstruct_historical(mut message: ChatMessage) -> ChatMessage {
    message.stage = if message.error.is_some() {
        Stage::Error
    } else if message.stage == Stage::Final || message.response.is_some() {
        Stage::Final
    } else if message.stage.is_pending() {
        message.stage
    } else {
        Stage::FetchingLinks
    };
    message
}

/// Chat sessions of the signed-in user.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    placeholder_name: String,
    name_max_chars: usize,
    user: Option<UserId>,
    sessions: Vec<ChatSession>,
    active: Option<SessionId>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, placeholder_name: &str, name_max_chars: usize) -> Self {
        Self {
            store,
            placeholder_name: placeholder_name.to_string(),
            name_max_chars,
            user: None,
            sessions: Vec::new(),
            active: None,
        }
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn active(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    fn require_user(&self) -> Result<&UserId, DelveError> {
        self.user
            .as_ref()
            .ok_or(DelveError::Validation(ValidationError::NotAuthenticated))
    }

    /// Signs `user` in and loads their sessions. Any previous state is dropped.
    pub async fn sign_in(&mut self, user: UserId) -> Result<&[ChatSession], DelveError> {
        let sessions = self.store.list_sessions(&user).await?;
        info!(user_id = %user, sessions = sessions.len(), "signed in");
        self.user = Some(user);
        self.sessions = sessions;
        self.active = None;
        Ok(&self.sessions)
    }

    /// Discards all session state.
    pub fn sign_out(&mut self) {
        if let Some(user) = self.user.take() {
            info!(user_id = %user, "signed out");
        }
        self.sessions.clear();
        self.active = None;
    }

    /// Reloads the session list from the store, newest first.
    pub async fn list_sessions(&mut self) -> Result<&[ChatSession], DelveError> {
        let user = self.require_user()?;
        self.sessions = self.store.list_sessions(user).await?;
        Ok(&self.sessions)
    }

    /// Creates a session, prepends it to the list and makes it active.
    ///
    /// `name` defaults to the placeholder name. A store failure aborts
    /// without touching in-memory state.
    pub async fn create_session(&mut self, name: Option<&str>) -> Result<ChatSession, DelveError> {
        let user = self.require_user()?.clone();
        let session = ChatSession {
            id: SessionId(uuid::Uuid::new_v4().to_string()),
            user_id: user,
            created_at: now_rfc3339(),
            session_name: name.unwrap_or(&self.placeholder_name).to_string(),
        };
        self.store.create_session(&session).await?;
        debug!(session_id = %session.id, "session created");

        self.sessions.insert(0, session.clone());
        self.active = Some(session.id.clone());
        Ok(session)
    }

    /// Makes `id` active and returns its history.
    ///
    /// Returns `Ok(None)` without touching the store when `id` is already
    /// active.
    pub async fn select_session(
        &mut self,
        id: &SessionId,
    ) -> Result<Option<Vec<ChatMessage>>, DelveError> {
        self.require_user()?;
        if self.active.as_ref() == Some(id) {
            debug!(session_id = %id, "session already active");
            return Ok(None);
        }
        if !self.sessions.iter().any(|s| &s.id == id) {
            return Err(ValidationError::UnknownSession(id.to_string()).into());
        }

        let history: Vec<ChatMessage> = self
            .store
            .list_messages(id)
            .await?
            .into_iter()
            .map(reconstruct_historical)
            .collect();
        debug!(session_id = %id, messages = history.len(), "session selected");
        self.active = Some(id.clone());
        Ok(Some(history))
    }

    /// Renames `id` after `query` if it still carries the placeholder name.
    ///
    /// Callers invoke this for the first message of a session only. A query
    /// that truncates to the placeholder itself leaves the name as is.
    /// Returns the new name when a rename happened. A failed store write is
    /// logged and the in-memory name is updated regardless, so the rename is
    /// never attempted twice.
    pub async fn rename_on_first_message(&mut self, id: &SessionId, query: &str) -> Option<String> {
        let name_max_chars = self.name_max_chars;
        let session = self
            .sessions
            .iter_mut()
            .find(|s| &s.id == id && s.session_name == self.placeholder_name)?;

        let name = truncate_name(query, name_max_chars);
        if name == self.placeholder_name {
            debug!(session_id = %id, "query matches the placeholder name; not renaming");
            return None;
        }
        if let Err(e) = self.store.rename_session(id, &name).await {
            warn!(session_id = %id, error = %e, "failed to persist session rename");
        }
        session.session_name = name.clone();
        info!(session_id = %id, name = %name, "session renamed");
        Some(name)
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_core::{AiResponse, MessageId};
    use delve_test_utils::{MemoryStore, StoreOp};

    fn manager(store: &Arc<MemoryStore>) -> SessionManager {
        SessionManager::new(store.clone(), "New Chat", 30)
    }

    fn message(id: &str, session: &SessionId, error: Option<&str>) -> ChatMessage {
        ChatMessage {
            id: MessageId::from(id),
            session_id: session.clone(),
            user_id: "alice".into(),
            query: "q".into(),
            response: Some(AiResponse {
                final_answer: vec!["answer".into()],
                ..AiResponse::default()
            }),
            fetched_links: None,
            error: error.map(str::to_string),
            stage: Stage::Subquestions,
            created_at: now_rfc3339(),
        }
    }

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate_name("  Short question  ", 30), "Short question");
        let exact = "a".repeat(30);
        assert_eq!(truncate_name(&exact, 30), exact);
    }

    #[test]
    fn truncate_adds_ellipsis_within_cap() {
        let name = truncate_name("Explain CRISPR gene editing in detail please", 30);
        assert_eq!(name, "Explain CRISPR gene editing...");
        assert!(name.chars().count() <= 30);
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let name = truncate_name("Qu'est-ce que l'intrication quantique exactement", 10);
        assert_eq!(name, "Qu'est-...");
        let name = truncate_name("量子もつれとは何ですか教えてください", 8);
        assert_eq!(name.chars().count(), 8);
        assert!(name.ends_with("..."));
    }

    #[test]
    fn historical_rows_become_final_or_error() {
        let sid = SessionId::from("s");
        assert_eq!(reconstruct_historical(message("m1", &sid, None)).stage, Stage::Final);
        assert_eq!(
            reconstruct_historical(message("m2", &sid, Some("boom"))).stage,
            Stage::Error
        );
    }

    #[test]
    fn abandoned_rows_stay_unresolved() {
        let sid = SessionId::from("s");
        let mut row = message("m3", &sid, None);
        row.response = None;
        row.stage = Stage::FetchingAiAnalysis;
        assert_eq!(
            reconstruct_historical(row.clone()).stage,
            Stage::FetchingAiAnalysis
        );

        row.stage = Stage::Final;
        assert_eq!(reconstruct_historical(row).stage, Stage::Final);
    }

    #[tokio::test]
    async fn query_matching_the_placeholder_is_not_a_rename() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();
        let session = sessions.create_session(None).await.unwrap();

        assert!(
            sessions
                .rename_on_first_message(&session.id, "New Chat")
                .await
                .is_none()
        );
        assert_eq!(store.call_count(StoreOp::RenameSession).await, 0);
    }

    #[tokio::test]
    async fn operations_require_sign_in() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        let err = sessions.create_session(None).await.unwrap_err();
        assert!(matches!(
            err,
            DelveError::Validation(ValidationError::NotAuthenticated)
        ));
        assert!(sessions.list_sessions().await.is_err());
    }

    #[tokio::test]
    async fn created_sessions_are_prepended_and_active() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();

        let first = sessions.create_session(None).await.unwrap();
        let second = sessions.create_session(Some("Named")).await.unwrap();
        assert_eq!(first.session_name, "New Chat");
        assert_eq!(sessions.sessions()[0].id, second.id);
        assert_eq!(sessions.active(), Some(&second.id));

        let reloaded = sessions.list_sessions().await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded[0].session_name, "Named");
    }

    #[tokio::test]
    async fn failed_create_leaves_state_untouched() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();
        store.fail_on(StoreOp::CreateSession).await;

        assert!(sessions.create_session(None).await.is_err());
        assert!(sessions.sessions().is_empty());
        assert_eq!(sessions.active(), None);
    }

    #[tokio::test]
    async fn reselecting_active_session_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();
        let session = sessions.create_session(None).await.unwrap();

        let before = store.call_count(StoreOp::ListMessages).await;
        assert!(sessions.select_session(&session.id).await.unwrap().is_none());
        assert_eq!(store.call_count(StoreOp::ListMessages).await, before);
    }

    #[tokio::test]
    async fn selecting_loads_reconstructed_history() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();
        let old = sessions.create_session(None).await.unwrap();
        store
            .insert_message(&message("m1", &old.id, None))
            .await
            .unwrap();
        sessions.create_session(None).await.unwrap();

        let history = sessions.select_session(&old.id).await.unwrap().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].stage, Stage::Final);
        assert_eq!(
            history[0].response.as_ref().unwrap().final_answer,
            vec!["answer"]
        );
        assert_eq!(sessions.active(), Some(&old.id));
    }

    #[tokio::test]
    async fn selecting_unknown_session_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();
        let err = sessions
            .select_session(&SessionId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DelveError::Validation(ValidationError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn rename_happens_once() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();
        let session = sessions.create_session(None).await.unwrap();

        let renamed = sessions
            .rename_on_first_message(&session.id, "Explain CRISPR gene editing in detail please")
            .await;
        assert_eq!(renamed.as_deref(), Some("Explain CRISPR gene editing..."));
        assert!(
            sessions
                .rename_on_first_message(&session.id, "A follow-up question")
                .await
                .is_none()
        );
        assert_eq!(store.call_count(StoreOp::RenameSession).await, 1);

        let stored = store.sessions_snapshot().await;
        assert_eq!(stored[0].session_name, "Explain CRISPR gene editing...");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn failed_rename_is_logged_and_applied_in_memory() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();
        let session = sessions.create_session(None).await.unwrap();
        store.fail_on(StoreOp::RenameSession).await;

        let renamed = sessions
            .rename_on_first_message(&session.id, "Why is the sky blue?")
            .await;
        assert_eq!(renamed.as_deref(), Some("Why is the sky blue?"));
        assert_eq!(sessions.sessions()[0].session_name, "Why is the sky blue?");
        assert!(logs_contain("failed to persist session rename"));
    }

    #[tokio::test]
    async fn sign_out_discards_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut sessions = manager(&store);
        sessions.sign_in("alice".into()).await.unwrap();
        sessions.create_session(None).await.unwrap();

        sessions.sign_out();
        assert!(sessions.user().is_none());
        assert!(sessions.sessions().is_empty());
        assert!(sessions.active().is_none());
    }
}

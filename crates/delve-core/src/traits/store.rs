// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait: typed reads and writes over chat sessions and messages.

use async_trait::async_trait;

use crate::error::DelveError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatMessage, ChatSession, MessageId, MessagePatch, SessionId, UserId};

/// Persistent store for chat sessions and their messages.
///
/// Carries no business logic. Ordering guarantees are part of the contract:
/// sessions list newest first, messages list oldest first.
#[async_trait]
pub trait SessionStore: PluginAdapter {
    /// Prepares the backing store (migrations, connections).
    async fn initialize(&self) -> Result<(), DelveError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), DelveError>;

    /// Sessions owned by `user_id`, ordered by `created_at` descending.
    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<ChatSession>, DelveError>;

    async fn create_session(&self, session: &ChatSession) -> Result<(), DelveError>;

    /// Updates `session_name`, the only mutable session column.
    async fn rename_session(&self, id: &SessionId, name: &str) -> Result<(), DelveError>;

    /// Messages of one session, ordered by `created_at` ascending.
    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, DelveError>;

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), DelveError>;

    /// Applies a partial update to a stored message.
    async fn update_message(&self, id: &MessageId, patch: &MessagePatch)
    -> Result<(), DelveError>;
}

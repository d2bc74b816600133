// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshots and events published to the presentation layer.

use delve_core::{
    AiModel, AiResponse, ChatMessage, ChatSession, FetchedLinks, MessageId, SearchResultItem,
    SessionId, Stage, UserId,
};

/// Transient working state of the query in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentQuery {
    pub message_id: MessageId,
    pub query: String,
    pub stage: Stage,
    pub links: Option<FetchedLinks>,
    /// Reveal cursor into `links`; set only while gathering links.
    pub cursor: Option<usize>,
    pub response: Option<AiResponse>,
}

impl CurrentQuery {
    /// The link currently on display, if any.
    pub fn revealed_link(&self) -> Option<&SearchResultItem> {
        let cursor = self.cursor?;
        self.links.as_ref()?.results.get(cursor)
    }
}

/// Everything the presentation layer needs to render the assistant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub user: Option<UserId>,
    pub sessions: Vec<ChatSession>,
    pub active_session: Option<SessionId>,
    /// History of the active session, oldest first, including the pending row.
    pub messages: Vec<ChatMessage>,
    /// The single message mid-lifecycle, if any.
    pub pending: Option<MessageId>,
    pub current: Option<CurrentQuery>,
    pub model: AiModel,
}

impl View {
    pub fn active_session(&self) -> Option<&ChatSession> {
        let id = self.active_session.as_ref()?;
        self.sessions.iter().find(|s| &s.id == id)
    }

    pub fn message(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Stage of the query in flight, or `idle`.
    pub fn stage(&self) -> Stage {
        self.current.as_ref().map_or(Stage::Idle, |c| c.stage)
    }
}

/// A stage change of the query in flight, tagged with where it belongs.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    Entered {
        session_id: SessionId,
        message_id: MessageId,
        stage: Stage,
    },
    LinkRevealed {
        session_id: SessionId,
        message_id: MessageId,
        index: usize,
        link: SearchResultItem,
    },
    Failed {
        session_id: SessionId,
        message_id: MessageId,
        message: String,
    },
}

impl StageEvent {
    pub fn message_id(&self) -> &MessageId {
        match self {
            StageEvent::Entered { message_id, .. }
            | StageEvent::LinkRevealed { message_id, .. }
            | StageEvent::Failed { message_id, .. } => message_id,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        match self {
            StageEvent::Entered { session_id, .. }
            | StageEvent::LinkRevealed { session_id, .. }
            | StageEvent::Failed { session_id, .. } => session_id,
        }
    }

    /// True for the last event of a message's lifecycle.
    pub fn is_terminal(&self) -> bool {
        match self {
            StageEvent::Entered { stage, .. } => stage.is_terminal(),
            StageEvent::Failed { .. } => true,
            StageEvent::LinkRevealed { .. } => false,
        }
    }
}

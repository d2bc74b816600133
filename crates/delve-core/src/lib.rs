// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Delve research assistant.
//!
//! This crate provides the domain types, the error type, and the adapter
//! traits behind which the session store and the research backend live.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DelveError, ValidationError};
pub use types::{
    AdapterType, AiModel, AiResponse, AuthUser, ChatMessage, ChatSession, FetchedLinks,
    HealthStatus, MessageId, MessagePatch, SearchResultItem, SessionId, Stage, UserId,
};

pub use traits::{PluginAdapter, ResearchBackend, SessionStore};

// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Delve research assistant.

use thiserror::Error;

use crate::types::Stage;

/// The primary error type used across all Delve adapter traits and core operations.
#[derive(Debug, Error)]
pub enum DelveError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Session store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Research backend failures (network, non-2xx status, malformed body).
    ///
    /// Displays as the bare message so it can be shown to the user as-is.
    #[error("{message}")]
    Upstream {
        message: String,
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Input rejected before any network or persistence call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A stage transition that the timeline does not allow.
    #[error("illegal transition `{event}` from stage {from}")]
    IllegalTransition { from: Stage, event: &'static str },

    /// A session or message id that does not resolve.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DelveError {
    /// Builds an upstream failure carrying only a message.
    pub fn upstream(message: impl Into<String>) -> Self {
        DelveError::Upstream {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        DelveError::Storage {
            source: source.into(),
        }
    }
}

/// Input validation failures. No state is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("sign in before starting a research query")]
    NotAuthenticated,

    #[error("a query is already in progress in this chat")]
    QueryInFlight,

    #[error("no chat session with id {0}")]
    UnknownSession(String),
}

// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query lifecycle and session management for the Delve research assistant.
//!
//! The [`Assistant`] actor owns all mutable state:
//! - The signed-in user and their chat sessions ([`SessionManager`])
//! - The active session's message history
//! - The single query in flight, driven by a [`QueryRun`] through the
//!   [`Timeline`]
//!
//! The presentation layer drives it through an [`AssistantHandle`] and
//! renders the published [`View`] and [`StageEvent`]s. Final answers are
//! rendered with [`resolve_citations`].

pub mod assistant;
pub mod citations;
pub mod orchestrator;
pub mod session_manager;
pub mod timeline;
pub mod view;

pub use assistant::{Assistant, AssistantConfig, AssistantHandle};
pub use citations::{ResolvedAnswer, Segment, extract_url, resolve_citations};
pub use orchestrator::{Pacing, QueryRun, RunEvent, RunUpdate, Ticket};
pub use session_manager::{SessionManager, reconstruct_historical, truncate_name};
pub use timeline::{Timeline, TimelineEvent};
pub use view::{CurrentQuery, StageEvent, View};

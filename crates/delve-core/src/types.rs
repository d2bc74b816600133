// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, the backend client, and the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a chat session.
    SessionId
);
string_id!(
    /// Unique identifier for a chat message.
    MessageId
);
string_id!(
    /// Identifier of the authenticated user owning sessions and messages.
    UserId
);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Store,
    Backend,
}

/// One phase of the query lifecycle.
///
/// Declared in forward order; `Error` is terminal and reachable from any
/// non-idle stage.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Stage {
    #[default]
    Idle,
    FetchingLinks,
    GatheringLinks,
    FetchingAiAnalysis,
    Subquestions,
    Analysis,
    Synthesis,
    Final,
    Error,
}

impl Stage {
    /// `Final` and `Error` end a message's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Final | Stage::Error)
    }

    /// A message in a pending stage is mid-lifecycle.
    pub fn is_pending(self) -> bool {
        !self.is_terminal() && self != Stage::Idle
    }
}

/// AI model used for the analysis call.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AiModel {
    #[default]
    Gemini,
    Mistral,
}

impl AiModel {
    /// Backend path serving analysis for this model.
    pub fn analysis_endpoint(self) -> &'static str {
        match self {
            AiModel::Gemini => "fetch-ai-analysis",
            AiModel::Mistral => "fetch-ai-analysis-mistral",
        }
    }
}

/// An authenticated identity, as handed over by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// One link candidate produced by the search service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Request body for `fetch-links`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLinksRequest {
    pub query: String,
}

/// Response body of `fetch-links`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedLinks {
    #[serde(default)]
    pub query: String,
    pub results: Vec<SearchResultItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
}

impl FetchedLinks {
    /// An empty link set, used when the search service returns nothing.
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            results: Vec::new(),
            total_results: Some(0),
        }
    }
}

/// Request body for the AI-analysis endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AiAnalysisRequest<'a> {
    pub original_query: &'a str,
    pub search_results: &'a FetchedLinks,
}

/// One analysed sub-question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStep {
    pub question: String,
    pub analysis_content: String,
}

/// Structured answer returned by the AI-analysis service.
///
/// The four content arrays are revealed in order; `final_answer` cites
/// `sources` by 1-based `[Source N]` markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    #[serde(default)]
    pub sub_questions: Vec<String>,
    #[serde(default)]
    pub analysis: Vec<AnalysisStep>,
    #[serde(default)]
    pub synthesis: Vec<String>,
    #[serde(default)]
    pub final_answer: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl AiResponse {
    /// True when the response carries nothing to reveal.
    pub fn is_empty(&self) -> bool {
        self.sub_questions.is_empty()
            && self.analysis.is_empty()
            && self.synthesis.is_empty()
            && self.final_answer.is_empty()
    }
}

/// A conversation grouping research exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    pub user_id: UserId,
    /// RFC 3339 timestamp.
    pub created_at: String,
    pub session_name: String,
}

/// One research exchange: the query and everything produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub query: String,
    pub response: Option<AiResponse>,
    pub fetched_links: Option<FetchedLinks>,
    pub error: Option<String>,
    pub stage: Stage,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

/// Partial update applied to a stored message by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePatch {
    pub stage: Option<Stage>,
    pub fetched_links: Option<FetchedLinks>,
    pub response: Option<AiResponse>,
    pub error: Option<String>,
}

impl MessagePatch {
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn links(links: FetchedLinks) -> Self {
        Self {
            fetched_links: Some(links),
            ..Self::default()
        }
    }

    pub fn response(response: AiResponse) -> Self {
        Self {
            response: Some(response),
            ..Self::default()
        }
    }

    /// Records a failure and moves the message to `Error`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: Some(Stage::Error),
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stage.is_none()
            && self.fetched_links.is_none()
            && self.response.is_none()
            && self.error.is_none()
    }

    /// Applies this patch to an in-memory message.
    pub fn apply_to(&self, message: &mut ChatMessage) {
        if let Some(stage) = self.stage {
            message.stage = stage;
        }
        if let Some(links) = &self.fetched_links {
            message.fetched_links = Some(links.clone());
        }
        if let Some(response) = &self.response {
            message.response = Some(response.clone());
        }
        if let Some(error) = &self.error {
            message.error = Some(error.clone());
        }
    }
}

// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types private to the HTTP client.
//!
//! Request and success bodies are the shared domain types in `delve-core`;
//! only the error and health envelopes live here.

use serde::Deserialize;

/// Error body returned by the research service on non-2xx responses.
///
/// `detail` is usually a string; validation failures carry a list of
/// objects instead.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    /// The message to show the user, if the body carried a usable `detail`.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::String(_) | serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_detail_is_used_verbatim() {
        let body: ApiErrorResponse =
            serde_json::from_str(r#"{"detail":"upstream timeout"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("upstream timeout"));
    }

    #[test]
    fn structured_detail_is_serialized() {
        let body: ApiErrorResponse =
            serde_json::from_str(r#"{"detail":[{"loc":["body","query"],"msg":"field required"}]}"#)
                .unwrap();
        let message = body.message().unwrap();
        assert!(message.contains("field required"), "got: {message}");
    }

    #[test]
    fn missing_or_blank_detail_yields_none() {
        let body: ApiErrorResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.message(), None);
        let body: ApiErrorResponse = serde_json::from_str(r#"{"detail":"  "}"#).unwrap();
        assert_eq!(body.message(), None);
    }
}

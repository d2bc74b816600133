// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the research service.
//!
//! Provides [`ResearchClient`] which handles URL construction, JSON bodies,
//! the request timeout, and normalization of every failure into
//! [`DelveError::Upstream`].

use std::time::Duration;

use delve_core::DelveError;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{ApiErrorResponse, HealthResponse};

/// HTTP client for the link-search and AI-analysis endpoints.
///
/// Calls are made once; failures are reported, never retried.
#[derive(Debug, Clone)]
pub struct ResearchClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl ResearchClient {
    /// Creates a client rooted at `base_url`. `None` disables the timeout.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, DelveError> {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| DelveError::Upstream {
            message: format!("failed to build HTTP client: {e}"),
            status: None,
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// The base URL every endpoint path is joined onto.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POSTs `body` as JSON to `path` and decodes the JSON reply.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, DelveError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(path, e))?;

        let status = response.status();
        debug!(status = %status, path, "research service responded");

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(path, e))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| DelveError::Upstream {
            message: format!("malformed response from {path}: {e}"),
            status: Some(status.as_u16()),
            source: Some(Box::new(e)),
        })
    }

    /// Probes `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse, DelveError> {
        let response = self
            .client
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(|e| self.transport_error("health", e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error("health", e))?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| DelveError::Upstream {
            message: format!("malformed health response: {e}"),
            status: Some(status.as_u16()),
            source: Some(Box::new(e)),
        })
    }

    fn transport_error(&self, path: &str, e: reqwest::Error) -> DelveError {
        let message = match self.timeout {
            Some(limit) if e.is_timeout() => format!(
                "the research service did not answer {path} within {}s",
                limit.as_secs()
            ),
            _ => format!("could not reach the research service: {e}"),
        };
        DelveError::Upstream {
            message,
            status: e.status().map(|s| s.as_u16()),
            source: Some(Box::new(e)),
        }
    }
}

/// Builds the error for a non-2xx reply, preferring the body's `detail`.
fn status_error(status: reqwest::StatusCode, body: &str) -> DelveError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .and_then(|err| err.message())
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
    DelveError::Upstream {
        message,
        status: Some(status.as_u16()),
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Echo {
        ok: bool,
    }

    fn upstream_parts(err: DelveError) -> (String, Option<u16>) {
        match err {
            DelveError::Upstream {
                message, status, ..
            } => (message, status),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fetch-links"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"query": "rust"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ResearchClient::new(&format!("{}/", server.uri()), None).unwrap();
        let echo: Echo = client
            .post_json("fetch-links", &json!({"query": "rust"}))
            .await
            .unwrap();
        assert_eq!(echo, Echo { ok: true });
    }

    #[tokio::test]
    async fn non_2xx_uses_detail_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"detail": "upstream timeout"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ResearchClient::new(&server.uri(), None).unwrap();
        let err = client
            .post_json::<_, Echo>("fetch-links", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "upstream timeout");
        assert_eq!(upstream_parts(err), ("upstream timeout".into(), Some(500)));
    }

    #[tokio::test]
    async fn non_2xx_without_detail_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = ResearchClient::new(&server.uri(), None).unwrap();
        let err = client
            .post_json::<_, Echo>("fetch-links", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "request failed with status 502");
    }

    #[tokio::test]
    async fn malformed_success_body_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ResearchClient::new(&server.uri(), None).unwrap();
        let err = client
            .post_json::<_, Echo>("fetch-links", &json!({}))
            .await
            .unwrap_err();
        let (message, status) = upstream_parts(err);
        assert!(message.starts_with("malformed response from fetch-links"));
        assert_eq!(status, Some(200));
    }

    #[tokio::test]
    async fn slow_reply_hits_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = ResearchClient::new(&server.uri(), Some(Duration::from_secs(1))).unwrap();
        let err = client
            .post_json::<_, Echo>("fetch-links", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "the research service did not answer fetch-links within 1s"
        );
    }

    #[tokio::test]
    async fn health_reads_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
            .mount(&server)
            .await;

        let client = ResearchClient::new(&server.uri(), None).unwrap();
        assert_eq!(client.health().await.unwrap().status, "healthy");
    }

    #[tokio::test]
    async fn unreachable_service_is_upstream_failure() {
        let client = ResearchClient::new("http://127.0.0.1:9", None).unwrap();
        let err = client
            .post_json::<_, Echo>("fetch-links", &json!({}))
            .await
            .unwrap_err();
        let (message, _) = upstream_parts(err);
        assert!(message.starts_with("could not reach the research service"));
    }
}

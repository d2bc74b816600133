// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock research backend for deterministic testing.
//!
//! `MockBackend` implements `ResearchBackend` with scripted results popped
//! from FIFO queues. A [`Gate`] can hold the next call open until the test
//! releases it, which makes mid-flight interleavings reproducible.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};

use delve_core::traits::adapter::PluginAdapter;
use delve_core::traits::backend::ResearchBackend;
use delve_core::types::{
    AdapterType, AiModel, AiResponse, FetchedLinks, HealthStatus, SearchResultItem,
};
use delve_core::DelveError;

/// Holds one backend call open until released.
#[derive(Clone)]
pub struct Gate {
    entered: watch::Sender<bool>,
    released: watch::Sender<bool>,
}

impl Gate {
    fn new() -> Self {
        Self {
            entered: watch::channel(false).0,
            released: watch::channel(false).0,
        }
    }

    /// Waits until the gated call has started.
    pub async fn entered(&self) {
        let mut rx = self.entered.subscribe();
        let _ = rx.wait_for(|entered| *entered).await;
    }

    /// Lets the gated call proceed.
    pub fn release(&self) {
        self.released.send_replace(true);
    }

    async fn pass(&self) {
        self.entered.send_replace(true);
        let mut rx = self.released.subscribe();
        let _ = rx.wait_for(|released| *released).await;
    }
}

/// A mock research backend returning pre-configured results.
///
/// When a queue is empty, `fetch_links` returns one canned link and
/// `fetch_ai_analysis` returns a canned answer citing it.
#[derive(Clone)]
pub struct MockBackend {
    links: Arc<Mutex<VecDeque<Result<FetchedLinks, DelveError>>>>,
    analyses: Arc<Mutex<VecDeque<Result<AiResponse, DelveError>>>>,
    links_gate: Arc<Mutex<Option<Gate>>>,
    analysis_gate: Arc<Mutex<Option<Gate>>>,
    link_queries: Arc<Mutex<Vec<String>>>,
    analysis_models: Arc<Mutex<Vec<AiModel>>>,
}

impl MockBackend {
    /// Create a new mock backend with empty queues.
    pub fn new() -> Self {
        Self {
            links: Arc::new(Mutex::new(VecDeque::new())),
            analyses: Arc::new(Mutex::new(VecDeque::new())),
            links_gate: Arc::new(Mutex::new(None)),
            analysis_gate: Arc::new(Mutex::new(None)),
            link_queries: Arc::new(Mutex::new(Vec::new())),
            analysis_models: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue the result of the next `fetch_links` call.
    pub async fn push_links(&self, result: Result<FetchedLinks, DelveError>) {
        self.links.lock().await.push_back(result);
    }

    /// Queue the result of the next `fetch_ai_analysis` call.
    pub async fn push_analysis(&self, result: Result<AiResponse, DelveError>) {
        self.analyses.lock().await.push_back(result);
    }

    /// Hold the next `fetch_links` call until the returned gate is released.
    pub async fn gate_links(&self) -> Gate {
        let gate = Gate::new();
        *self.links_gate.lock().await = Some(gate.clone());
        gate
    }

    /// Hold the next `fetch_ai_analysis` call until the returned gate is released.
    pub async fn gate_analysis(&self) -> Gate {
        let gate = Gate::new();
        *self.analysis_gate.lock().await = Some(gate.clone());
        gate
    }

    /// Queries passed to `fetch_links`, in call order.
    pub async fn link_queries(&self) -> Vec<String> {
        self.link_queries.lock().await.clone()
    }

    /// Models passed to `fetch_ai_analysis`, in call order.
    pub async fn analysis_models(&self) -> Vec<AiModel> {
        self.analysis_models.lock().await.clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// `n` canned search results for `query`.
pub fn sample_links(query: &str, n: usize) -> FetchedLinks {
    FetchedLinks {
        query: query.to_string(),
        results: (1..=n)
            .map(|i| SearchResultItem {
                title: format!("Result {i}"),
                url: format!("https://example.com/{i}"),
                content: Some(format!("Snippet {i}")),
            })
            .collect(),
        total_results: Some(n as u64),
    }
}

/// A canned analysis whose final answer cites the first source.
pub fn sample_analysis() -> AiResponse {
    AiResponse {
        sub_questions: vec!["What is being asked?".into()],
        analysis: Vec::new(),
        synthesis: vec!["The sources agree.".into()],
        final_answer: vec!["The answer [Source 1].".into()],
        sources: vec!["Source 1: https://example.com/1".into()],
    }
}

#[async_trait]
impl PluginAdapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, DelveError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DelveError> {
        Ok(())
    }
}

#[async_trait]
impl ResearchBackend for MockBackend {
    async fn fetch_links(&self, query: &str) -> Result<FetchedLinks, DelveError> {
        self.link_queries.lock().await.push(query.to_string());
        let gate = self.links_gate.lock().await.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.links
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(sample_links(query, 1)))
    }

    async fn fetch_ai_analysis(
        &self,
        model: AiModel,
        _original_query: &str,
        _links: &FetchedLinks,
    ) -> Result<AiResponse, DelveError> {
        self.analysis_models.lock().await.push(model);
        let gate = self.analysis_gate.lock().await.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.analyses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(sample_analysis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_results_are_returned_in_order() {
        let backend = MockBackend::new();
        backend.push_links(Ok(sample_links("q", 3))).await;
        backend
            .push_links(Err(DelveError::upstream("upstream timeout")))
            .await;

        assert_eq!(backend.fetch_links("q").await.unwrap().results.len(), 3);
        let err = backend.fetch_links("q").await.unwrap_err();
        assert_eq!(err.to_string(), "upstream timeout");
        assert_eq!(backend.fetch_links("q").await.unwrap().results.len(), 1);
        assert_eq!(backend.link_queries().await, vec!["q", "q", "q"]);
    }

    #[tokio::test]
    async fn analysis_records_the_model() {
        let backend = MockBackend::new();
        let links = sample_links("q", 1);
        backend
            .fetch_ai_analysis(AiModel::Mistral, "q", &links)
            .await
            .unwrap();
        assert_eq!(backend.analysis_models().await, vec![AiModel::Mistral]);
    }

    #[tokio::test]
    async fn gate_holds_the_call_until_released() {
        let backend = MockBackend::new();
        let gate = backend.gate_links().await;

        let call = tokio::spawn({
            let backend = backend.clone();
            async move { backend.fetch_links("q").await }
        });
        gate.entered().await;
        assert!(!call.is_finished());

        gate.release();
        assert!(call.await.unwrap().is_ok());
    }
}

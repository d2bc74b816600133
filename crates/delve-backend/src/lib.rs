// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Research backend adapter for the Delve assistant.
//!
//! This crate implements [`ResearchBackend`] over HTTP: `fetch-links` for
//! candidate links and the per-model AI-analysis endpoints for the
//! structured answer.

pub mod client;
pub mod types;

use async_trait::async_trait;
use delve_config::model::BackendConfig;
use delve_core::types::{
    AdapterType, AiAnalysisRequest, AiModel, AiResponse, FetchLinksRequest, FetchedLinks,
    HealthStatus,
};
use delve_core::{DelveError, PluginAdapter, ResearchBackend};
use tracing::{debug, info};

use crate::client::ResearchClient;

/// HTTP research backend implementing [`ResearchBackend`].
pub struct HttpBackend {
    client: ResearchClient,
    links_path: String,
}

impl HttpBackend {
    /// Creates a backend from the `[backend]` config section.
    pub fn new(config: &BackendConfig) -> Result<Self, DelveError> {
        let client = ResearchClient::new(&config.base_url, config.request_timeout())?;
        info!(
            base_url = %client.base_url(),
            timeout_secs = config.request_timeout_secs,
            "research backend initialized"
        );
        Ok(Self::with_client(client, &config.links_path))
    }

    /// Creates a backend around an existing client.
    pub fn with_client(client: ResearchClient, links_path: &str) -> Self {
        Self {
            client,
            links_path: links_path.to_string(),
        }
    }
}

#[async_trait]
impl PluginAdapter for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, DelveError> {
        match self.client.health().await {
            Ok(health) if health.status == "healthy" => Ok(HealthStatus::Healthy),
            Ok(health) => Ok(HealthStatus::Degraded(format!(
                "service reports status `{}`",
                health.status
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), DelveError> {
        Ok(())
    }
}

#[async_trait]
impl ResearchBackend for HttpBackend {
    async fn fetch_links(&self, query: &str) -> Result<FetchedLinks, DelveError> {
        let request = FetchLinksRequest {
            query: query.to_string(),
        };
        let links: FetchedLinks = self.client.post_json(&self.links_path, &request).await?;
        debug!(results = links.results.len(), "links fetched");
        Ok(links)
    }

    async fn fetch_ai_analysis(
        &self,
        model: AiModel,
        original_query: &str,
        links: &FetchedLinks,
    ) -> Result<AiResponse, DelveError> {
        let request = AiAnalysisRequest {
            original_query,
            search_results: links,
        };
        let response: AiResponse = self
            .client
            .post_json(model.analysis_endpoint(), &request)
            .await?;
        if response.is_empty() {
            return Err(DelveError::upstream(format!(
                "the {model} analysis returned no content"
            )));
        }
        debug!(
            %model,
            sub_questions = response.sub_questions.len(),
            final_answer = response.final_answer.len(),
            "analysis received"
        );
        Ok(response)
    }
}

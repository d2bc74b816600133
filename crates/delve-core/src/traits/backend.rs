// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Research backend trait for the link-search and AI-analysis services.

use async_trait::async_trait;

use crate::error::DelveError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AiModel, AiResponse, FetchedLinks};

/// Client for the two upstream research services.
///
/// Implementations normalize every failure (transport, non-2xx status,
/// malformed or empty body) into [`DelveError::Upstream`] whose message is
/// fit for display.
#[async_trait]
pub trait ResearchBackend: PluginAdapter {
    /// Fetches candidate links for the raw query string.
    async fn fetch_links(&self, query: &str) -> Result<FetchedLinks, DelveError>;

    /// Requests structured analysis of `links` from the endpoint serving `model`.
    async fn fetch_ai_analysis(
        &self,
        model: AiModel,
        original_query: &str,
        links: &FetchedLinks,
    ) -> Result<AiResponse, DelveError>;
}

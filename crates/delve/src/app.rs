// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the running assistant from configuration.

use std::sync::Arc;

use delve_agent::{Assistant, AssistantConfig, AssistantHandle};
use delve_backend::HttpBackend;
use delve_config::DelveConfig;
use delve_core::{AuthUser, DelveError, ResearchBackend, SessionStore};
use delve_storage::SqliteStore;
use tracing::{debug, warn};

/// A signed-in assistant with its store.
pub struct App {
    pub assistant: AssistantHandle,
    store: Arc<dyn SessionStore>,
}

impl App {
    /// Opens the store, connects the backend and signs in the configured user.
    pub async fn start(config: &DelveConfig) -> Result<Self, DelveError> {
        let store = open_store(config).await?;
        let backend: Arc<dyn ResearchBackend> = Arc::new(HttpBackend::new(&config.backend)?);

        let assistant = Assistant::spawn(
            AssistantConfig::from_config(config),
            store.clone(),
            backend,
        );
        assistant
            .sign_in(AuthUser {
                id: config.app.user_id.as_str().into(),
                email: None,
            })
            .await?;
        debug!(user_id = config.app.user_id.as_str(), "assistant ready");

        Ok(Self { assistant, store })
    }

    /// Stops the assistant and flushes the store.
    pub async fn shutdown(self) -> Result<(), DelveError> {
        if let Err(e) = self.assistant.shutdown().await {
            warn!(error = %e, "assistant did not stop cleanly");
        }
        self.store.close().await
    }
}

/// Opens and migrates the configured SQLite store.
pub async fn open_store(config: &DelveConfig) -> Result<Arc<dyn SessionStore>, DelveError> {
    let store = SqliteStore::new(config.storage.clone());
    store.initialize().await?;
    Ok(Arc::new(store))
}

// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Delve research assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use delve_core::AiModel;
use serde::{Deserialize, Serialize};

/// Top-level Delve configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DelveConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Research backend endpoint settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// AI model selection.
    #[serde(default)]
    pub model: ModelConfig,

    /// Stage reveal pacing.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Chat session naming.
    #[serde(default)]
    pub session: SessionConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Identity the CLI signs in as.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            user_id: default_user_id(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_user_id() -> String {
    "local".to_string()
}

/// Research backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL the endpoint paths are joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the link-search endpoint.
    #[serde(default = "default_links_path")]
    pub links_path: String,

    /// Per-request timeout in seconds. `0` leaves requests unbounded.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    /// Request timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            links_path: default_links_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_links_path() -> String {
    "fetch-links".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// AI model selection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Model used for AI analysis until changed at runtime.
    #[serde(default)]
    pub selected: AiModel,
}

/// Pacing of the progressive reveal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PacingConfig {
    /// Time each of sub-questions, analysis and synthesis stays on screen.
    #[serde(default = "default_stage_dwell_ms")]
    pub stage_dwell_ms: u64,

    /// Time each fetched link stays on screen while links are gathered.
    #[serde(default = "default_link_reveal_ms")]
    pub link_reveal_ms: u64,
}

impl PacingConfig {
    pub fn stage_dwell(&self) -> Duration {
        Duration::from_millis(self.stage_dwell_ms)
    }

    pub fn link_reveal(&self) -> Duration {
        Duration::from_millis(self.link_reveal_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            stage_dwell_ms: default_stage_dwell_ms(),
            link_reveal_ms: default_link_reveal_ms(),
        }
    }
}

fn default_stage_dwell_ms() -> u64 {
    2000
}

fn default_link_reveal_ms() -> u64 {
    500
}

/// Chat session naming.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Name given to sessions before their first message.
    #[serde(default = "default_placeholder_name")]
    pub placeholder_name: String,

    /// Maximum characters kept when naming a session after its first query.
    #[serde(default = "default_name_max_chars")]
    pub name_max_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            placeholder_name: default_placeholder_name(),
            name_max_chars: default_name_max_chars(),
        }
    }
}

fn default_placeholder_name() -> String {
    "New Chat".to_string()
}

fn default_name_max_chars() -> usize {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("delve").join("delve.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("delve.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

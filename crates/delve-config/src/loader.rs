// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./delve.toml` > `~/.config/delve/delve.toml` > `/etc/delve/delve.toml`
//! with environment variable overrides via `DELVE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DelveConfig;

/// Config sections that environment keys are mapped into.
const SECTIONS: &[&str] = &["app", "backend", "model", "pacing", "session", "storage"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/delve/delve.toml` (system-wide)
/// 3. `~/.config/delve/delve.toml` (user XDG config)
/// 4. `./delve.toml` (local directory)
/// 5. `DELVE_*` environment variables
pub fn load_config() -> Result<DelveConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<DelveConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DelveConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DelveConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DelveConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DelveConfig::default()))
        .merge(Toml::file("/etc/delve/delve.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("delve/delve.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("delve.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `DELVE_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `DELVE_PACING_STAGE_DWELL_MS` maps to `pacing.stage_dwell_ms`.
fn env_provider() -> Env {
    Env::prefixed("DELVE_").map(|key| {
        let key_str = key.as_str();
        let mapped = SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}

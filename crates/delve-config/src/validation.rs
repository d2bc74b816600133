// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::DelveConfig;

/// Shortest session name cap that still leaves room for a character and `...`.
const MIN_NAME_MAX_CHARS: usize = 4;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &DelveConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.backend.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::validation("backend.base_url must not be empty"));
    } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "backend.base_url `{base_url}` must start with http:// or https://"
        )));
    }

    if config.backend.links_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "backend.links_path must not be empty",
        ));
    }

    if config.session.placeholder_name.trim().is_empty() {
        errors.push(ConfigError::validation(
            "session.placeholder_name must not be empty",
        ));
    }

    if config.session.name_max_chars < MIN_NAME_MAX_CHARS {
        errors.push(ConfigError::validation(format!(
            "session.name_max_chars must be at least {MIN_NAME_MAX_CHARS}, got {}",
            config.session.name_max_chars
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Delve configuration system.

use delve_config::diagnostic::ConfigError;
use delve_config::{load_and_validate_str, load_config_from_str};
use delve_core::AiModel;

#[test]
fn valid_toml_deserializes_into_delve_config() {
    let toml = r#"
[app]
log_level = "debug"
user_id = "alice"

[backend]
base_url = "https://research.example.com"
links_path = "search/links"
request_timeout_secs = 30

[model]
selected = "mistral"

[pacing]
stage_dwell_ms = 1500
link_reveal_ms = 250

[session]
placeholder_name = "Untitled"
name_max_chars = 40

[storage]
database_path = "/tmp/delve-test.db"
wal_mode = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.app.log_level, "debug");
    assert_eq!(config.app.user_id, "alice");
    assert_eq!(config.backend.base_url, "https://research.example.com");
    assert_eq!(config.backend.links_path, "search/links");
    assert_eq!(config.backend.request_timeout_secs, 30);
    assert_eq!(config.model.selected, AiModel::Mistral);
    assert_eq!(config.pacing.stage_dwell_ms, 1500);
    assert_eq!(config.pacing.link_reveal_ms, 250);
    assert_eq!(config.session.placeholder_name, "Untitled");
    assert_eq!(config.session.name_max_chars, 40);
    assert_eq!(config.storage.database_path, "/tmp/delve-test.db");
    assert!(!config.storage.wal_mode);
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.model.selected, AiModel::Gemini);
    assert_eq!(config.pacing.stage_dwell_ms, 2000);
}

#[test]
fn unknown_field_produces_suggestion() {
    let toml = r#"
[pacing]
stage_dwel_ms = 100
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } if key == "stage_dwel_ms" => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("stage_dwell_ms"));
}

#[test]
fn unknown_model_is_rejected() {
    let toml = r#"
[model]
selected = "gpt-9"
"#;
    assert!(load_config_from_str(toml).is_err());
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[pacing]
link_reveal_ms = "fast"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject string for integer");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_))),
        "got: {errors:?}"
    );
}

#[test]
fn semantic_validation_runs_after_parse() {
    let toml = r#"
[backend]
base_url = "localhost:8000"
"#;
    let errors = load_and_validate_str(toml).expect_err("scheme-less URL should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("base_url"))
    ));
}

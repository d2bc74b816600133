// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `delve doctor` command implementation.
//!
//! Runs diagnostic checks against the configuration, the local chat store
//! and the research service.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use colored::Colorize;
use delve_backend::HttpBackend;
use delve_config::DelveConfig;
use delve_core::{DelveError, HealthStatus, PluginAdapter, SessionStore};
use delve_storage::SqliteStore;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }

    fn from_health(name: &str, health: Result<HealthStatus, DelveError>, start: Instant) -> Self {
        match health {
            Ok(HealthStatus::Healthy) => Self::new(name, CheckStatus::Pass, "healthy", start),
            Ok(HealthStatus::Degraded(reason)) => Self::new(name, CheckStatus::Warn, reason, start),
            Ok(HealthStatus::Unhealthy(reason)) => Self::new(name, CheckStatus::Fail, reason, start),
            Err(e) => Self::new(name, CheckStatus::Fail, e.to_string(), start),
        }
    }

    fn line(&self, use_color: bool) -> String {
        let duration_ms = self.duration.as_millis();
        let (symbol, message) = match (&self.status, use_color) {
            (CheckStatus::Pass, true) => ("✓".green().to_string(), self.message.clone()),
            (CheckStatus::Warn, true) => ("!".yellow().to_string(), self.message.yellow().to_string()),
            (CheckStatus::Fail, true) => ("✗".red().to_string(), self.message.red().to_string()),
            (CheckStatus::Pass, false) => ("[OK]  ".to_string(), self.message.clone()),
            (CheckStatus::Warn, false) => ("[WARN]".to_string(), self.message.clone()),
            (CheckStatus::Fail, false) => ("[FAIL]".to_string(), self.message.clone()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", self.name)
    }
}

/// Run the `delve doctor` command.
///
/// Returns the number of failed checks. With `plain`, disables colored output.
pub async fn run_doctor(config: &DelveConfig, plain: bool) -> Result<usize, DelveError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_config(config),
        check_database(config).await,
        check_backend(config).await,
        check_model(config),
    ];

    println!();
    println!("  delve doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", result.line(use_color));
    }
    println!();

    let fail_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(fail_count)
}

fn check_config(config: &DelveConfig) -> CheckResult {
    let start = Instant::now();
    match delve_config::validation::validate_config(config) {
        Ok(()) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Opens the chat store (running migrations) and probes it.
async fn check_database(config: &DelveConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;
    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            "Chat store",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let store = SqliteStore::new(config.storage.clone());
    if let Err(e) = store.initialize().await {
        return CheckResult::new("Chat store", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let health = store.health_check().await;
    let _ = store.close().await;
    CheckResult::from_health("Chat store", health, start)
}

async fn check_backend(config: &DelveConfig) -> CheckResult {
    let start = Instant::now();
    match HttpBackend::new(&config.backend) {
        Ok(backend) => CheckResult::from_health("Research service", backend.health_check().await, start),
        Err(e) => CheckResult::new("Research service", CheckStatus::Fail, e.to_string(), start),
    }
}

fn check_model(config: &DelveConfig) -> CheckResult {
    let start = Instant::now();
    let model = config.model.selected;
    CheckResult::new(
        "Analysis model",
        CheckStatus::Pass,
        format!("{model} via /{}", model.analysis_endpoint()),
        start,
    )
}

// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delve - a terminal research assistant.
//!
//! This is the binary entry point for the Delve CLI.

mod app;
mod ask;
mod doctor;
mod history;
mod render;
mod shell;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use delve_config::DelveConfig;
use delve_core::AiModel;

/// Delve - a terminal research assistant.
#[derive(Parser, Debug)]
#[command(name = "delve", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch the interactive research shell (the default).
    Shell,
    /// Research one question in a new chat and print the answer.
    Ask {
        /// The question to research.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Model for the analysis (gemini or mistral).
        #[arg(long)]
        model: Option<AiModel>,
    },
    /// List your chat sessions, newest first.
    Sessions {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the stored exchanges of one chat session.
    History {
        session_id: String,
        /// Print JSON instead of formatted text.
        #[arg(long)]
        json: bool,
    },
    /// Check configuration, the chat store and the research service.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Option<DelveConfig> {
    let loaded = match path {
        Some(path) => delve_config::load_and_validate_path(path),
        None => delve_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            delve_config::render_errors(&errors);
            None
        }
    }
}

/// Installs the stderr subscriber; `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("delve={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(config) = load_config(cli.config.as_ref()) else {
        return ExitCode::FAILURE;
    };
    init_tracing(&config.app.log_level);

    let outcome = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell::run_shell(&config).await.map(|()| true),
        Commands::Ask { query, model } => ask::run_ask(&config, &query.join(" "), model).await,
        Commands::Sessions { json } => history::run_sessions(&config, json).await.map(|()| true),
        Commands::History { session_id, json } => history::run_history(&config, &session_id, json)
            .await
            .map(|()| true),
        Commands::Doctor { plain } => doctor::run_doctor(&config, plain)
            .await
            .map(|failures| failures == 0),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {e}", "error".red());
            ExitCode::FAILURE
        }
    }
}

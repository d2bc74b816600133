// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `delve shell` command implementation.
//!
//! Launches an interactive REPL with colored prompt, progressive stage
//! output, and readline history. Plain lines are research queries; lines
//! starting with `/` are commands.

use std::str::FromStr;

use colored::Colorize;
use delve_config::DelveConfig;
use delve_core::{AiModel, DelveError};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::app::App;
use crate::ask::follow;
use crate::render;

const HELP: &str = "\
  /new           start a new chat
  /sessions      list your chats
  /switch N      open chat number N from /sessions
  /model NAME    use NAME (gemini, mistral) for the next analysis
  /help          show this help
  /quit          leave the shell";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Query(String),
    New,
    Sessions,
    /// 1-based position in the session list.
    Switch(usize),
    Model(AiModel),
    Help,
    Quit,
    /// A command that could not be parsed, with the reason.
    Invalid(String),
}

/// Parses a line; blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ShellCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(ShellCommand::Query(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let parsed = match name {
        "new" => ShellCommand::New,
        "sessions" => ShellCommand::Sessions,
        "switch" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => ShellCommand::Switch(n),
            _ => ShellCommand::Invalid("usage: /switch N (see /sessions)".into()),
        },
        "model" => match AiModel::from_str(arg) {
            Ok(model) => ShellCommand::Model(model),
            Err(_) => ShellCommand::Invalid(format!(
                "unknown model `{arg}` (expected gemini or mistral)"
            )),
        },
        "help" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => ShellCommand::Invalid(format!("unknown command /{other}, try /help")),
    };
    Some(parsed)
}

/// Runs the `delve shell` interactive REPL.
pub async fn run_shell(config: &DelveConfig) -> Result<(), DelveError> {
    let app = App::start(config).await?;

    let mut rl = DefaultEditor::new()
        .map_err(|e| DelveError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "delve shell".bold().green());
    println!(
        "Ask a question, or type {} for commands.\n",
        "/help".yellow()
    );

    let prompt = format!("{}> ", "delve".green());
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };
        let Some(command) = parse_line(&line) else {
            continue;
        };
        let _ = rl.add_history_entry(line.trim());

        if command == ShellCommand::Quit {
            break;
        }
        if let Err(e) = handle_command(&app, command).await {
            eprintln!("{}: {e}", "error".red());
        }
    }

    app.shutdown().await?;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

async fn handle_command(app: &App, command: ShellCommand) -> Result<(), DelveError> {
    let assistant = &app.assistant;
    match command {
        ShellCommand::Query(query) => {
            let mut events = assistant.subscribe();
            let ticket = assistant.submit(&query).await?;
            let stage = follow(assistant, &mut events, &ticket.message_id).await?;
            debug!(message_id = %ticket.message_id, %stage, "query finished");
            println!();
        }
        ShellCommand::New => {
            let session = assistant.new_chat().await?;
            println!("Started {}.", session.session_name.bold());
        }
        ShellCommand::Sessions => {
            let sessions = assistant.refresh_sessions().await?;
            let view = assistant.view();
            for line in render::session_lines(&sessions, view.active_session.as_ref()) {
                println!("{line}");
            }
        }
        ShellCommand::Switch(n) => {
            let view = assistant.view();
            let session = view.sessions.get(n - 1).ok_or_else(|| {
                DelveError::NotFound {
                    kind: "session number",
                    id: n.to_string(),
                }
            })?;
            if assistant.select_session(&session.id).await? {
                println!("Opened {}.", session.session_name.bold());
                for message in assistant.view().messages {
                    for line in render::message_lines(&message) {
                        println!("{line}");
                    }
                    println!();
                }
            } else {
                println!("{} is already open.", session.session_name.bold());
            }
        }
        ShellCommand::Model(model) => {
            assistant.select_model(model).await?;
            println!("Using {} for the next analysis.", model.to_string().bold());
        }
        ShellCommand::Help => println!("{HELP}"),
        ShellCommand::Invalid(reason) => eprintln!("{}", reason.yellow()),
        ShellCommand::Quit => {}
    }
    Ok(())
}

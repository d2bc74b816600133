// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `delve ask` command implementation, and the event follower the shell
//! shares with it.

use delve_agent::{AssistantHandle, StageEvent};
use delve_config::DelveConfig;
use delve_core::{AiModel, DelveError, MessageId, Stage};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::app::App;
use crate::render;

/// Prints the events of `message_id` until it reaches a terminal stage.
///
/// Returns that stage.
pub async fn follow(
    assistant: &AssistantHandle,
    events: &mut broadcast::Receiver<StageEvent>,
    message_id: &MessageId,
) -> Result<Stage, DelveError> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "renderer fell behind; stage events skipped");
                if let Some(stage) = settled_stage(assistant, message_id) {
                    return Ok(stage);
                }
                continue;
            }
            Err(RecvError::Closed) => {
                return Err(DelveError::Internal("assistant stopped mid-query".into()));
            }
        };
        if event.message_id() != message_id {
            continue;
        }

        let view = assistant.view();
        for line in render::event_lines(&event, &view) {
            println!("{line}");
        }
        match event {
            StageEvent::Entered { stage, .. } if stage.is_terminal() => return Ok(stage),
            StageEvent::Failed { .. } => return Ok(Stage::Error),
            _ => {}
        }
    }
}

/// Stage of `message_id` once it is no longer pending, printing its
/// outcome. The skipped events may have included the terminal one.
fn settled_stage(assistant: &AssistantHandle, message_id: &MessageId) -> Option<Stage> {
    let view = assistant.view();
    if view.pending.as_ref() == Some(message_id) {
        return None;
    }
    let Some(message) = view.message(message_id) else {
        return Some(Stage::Error);
    };
    for line in render::message_lines(message).into_iter().skip(1) {
        println!("{line}");
    }
    Some(message.stage)
}

/// Runs one query in a fresh chat session and prints it as it unfolds.
///
/// Returns `true` when the query reached its final answer.
pub async fn run_ask(
    config: &DelveConfig,
    query: &str,
    model: Option<AiModel>,
) -> Result<bool, DelveError> {
    let app = App::start(config).await?;
    let outcome = ask(&app.assistant, query, model).await;
    app.shutdown().await?;
    outcome
}

async fn ask(
    assistant: &AssistantHandle,
    query: &str,
    model: Option<AiModel>,
) -> Result<bool, DelveError> {
    if let Some(model) = model {
        assistant.select_model(model).await?;
    }
    assistant.new_chat().await?;

    let mut events = assistant.subscribe();
    let ticket = assistant.submit(query).await?;
    let stage = follow(assistant, &mut events, &ticket.message_id).await?;
    Ok(stage == Stage::Final)
}

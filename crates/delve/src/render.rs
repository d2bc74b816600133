// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering of stage events, answers and history.
//!
//! Every function returns lines rather than printing, so the shell and the
//! one-shot commands share one presentation.

use colored::Colorize;
use delve_agent::{ResolvedAnswer, StageEvent, View, resolve_citations};
use delve_core::{AiResponse, ChatMessage, ChatSession, SessionId, Stage};

fn heading(title: &str) -> String {
    format!("\n{}", title.bold().cyan())
}

/// Lines to print for one stage event.
///
/// `view` must be the snapshot published with the event; it supplies the
/// links and the analysis the event refers to.
pub fn event_lines(event: &StageEvent, view: &View) -> Vec<String> {
    match event {
        StageEvent::Entered {
            message_id, stage, ..
        } => {
            let message = view.message(message_id);
            let response = message.and_then(|m| m.response.as_ref());
            match stage {
                Stage::FetchingLinks => vec!["Searching for sources...".dimmed().to_string()],
                Stage::GatheringLinks => {
                    let count = message
                        .and_then(|m| m.fetched_links.as_ref())
                        .map_or(0, |l| l.results.len());
                    vec![format!("Found {count} sources:")]
                }
                Stage::FetchingAiAnalysis => {
                    vec![format!("Analyzing with {}...", view.model).dimmed().to_string()]
                }
                Stage::Subquestions => response.map_or_else(Vec::new, subquestion_lines),
                Stage::Analysis => response.map_or_else(Vec::new, analysis_lines),
                Stage::Synthesis => response.map_or_else(Vec::new, synthesis_lines),
                Stage::Final => response.map_or_else(Vec::new, answer_lines),
                Stage::Idle | Stage::Error => Vec::new(),
            }
        }
        StageEvent::LinkRevealed {
            message_id,
            index,
            link,
            ..
        } => {
            let total = view
                .message(message_id)
                .and_then(|m| m.fetched_links.as_ref())
                .map_or(index + 1, |l| l.results.len());
            vec![format!(
                "  [{}/{total}] {} {}",
                index + 1,
                link.title,
                link.url.dimmed()
            )]
        }
        StageEvent::Failed { message, .. } => {
            vec![format!("{} {message}", "error:".red().bold())]
        }
    }
}

fn subquestion_lines(response: &AiResponse) -> Vec<String> {
    let mut lines = vec![heading("Sub-questions")];
    lines.extend(response.sub_questions.iter().map(|q| format!("  - {q}")));
    lines
}

fn analysis_lines(response: &AiResponse) -> Vec<String> {
    let mut lines = vec![heading("Analysis")];
    for step in &response.analysis {
        lines.push(format!("  {}", step.question.bold()));
        lines.push(format!("    {}", step.analysis_content));
    }
    lines
}

fn synthesis_lines(response: &AiResponse) -> Vec<String> {
    let mut lines = vec![heading("Synthesis")];
    lines.extend(response.synthesis.iter().map(|p| format!("  {p}")));
    lines
}

/// The final answer with citations resolved, followed by its sources.
pub fn answer_lines(response: &AiResponse) -> Vec<String> {
    let resolved = resolve_citations(&response.final_answer, &response.sources);
    let mut lines = vec![heading("Answer")];
    lines.extend(
        resolved
            .paragraphs
            .iter()
            .map(|p| ResolvedAnswer::plain_paragraph(p)),
    );

    let cited = resolved.cited_sources();
    if !cited.is_empty() {
        lines.push(heading("Sources"));
        for (number, url, source) in cited {
            lines.push(format!("  [{number}] {}", url.unwrap_or(source)));
        }
    }
    if !resolved.unresolved.is_empty() {
        lines.push(
            format!(
                "note: unresolved citations {}",
                resolved.unresolved.join(", ")
            )
            .yellow()
            .to_string(),
        );
    }
    lines
}

/// A stored exchange: the query, then its answer or its failure.
pub fn message_lines(message: &ChatMessage) -> Vec<String> {
    let mut lines = vec![format!("{} {}", ">".green().bold(), message.query.bold())];
    match (&message.error, &message.response) {
        (Some(error), _) => lines.push(format!("{} {error}", "error:".red().bold())),
        (None, Some(response)) => lines.extend(answer_lines(response)),
        (None, None) if message.stage.is_pending() => lines.push(
            format!("(unresolved: interrupted during {})", message.stage)
                .yellow()
                .to_string(),
        ),
        (None, None) => lines.push("(no answer recorded)".dimmed().to_string()),
    }
    lines
}

/// Numbered session list; the active session is starred.
pub fn session_lines(sessions: &[ChatSession], active: Option<&SessionId>) -> Vec<String> {
    if sessions.is_empty() {
        return vec!["No chat sessions yet.".dimmed().to_string()];
    }
    sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let marker = if Some(&session.id) == active { "*" } else { " " };
            format!(
                "{marker} {:>2}. {} {}",
                i + 1,
                session.session_name,
                session.created_at.dimmed()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_agent::CurrentQuery;
    use delve_core::types::{AnalysisStep, SearchResultItem};
    use delve_core::{FetchedLinks, MessageId};

    fn plain() {
        colored::control::set_override(false);
    }

    fn response() -> AiResponse {
        AiResponse {
            sub_questions: vec!["What is it?".into()],
            analysis: vec![AnalysisStep {
                question: "What is it?".into(),
                analysis_content: "A correlation.".into(),
            }],
            synthesis: vec!["Sources agree.".into()],
            final_answer: vec!["Particles stay linked [Source 1] [Source 7].".into()],
            sources: vec!["Source 1: https://physics.example/a".into()],
        }
    }

    fn view_with(message: ChatMessage) -> View {
        View {
            current: Some(CurrentQuery {
                message_id: message.id.clone(),
                query: message.query.clone(),
                stage: message.stage,
                links: message.fetched_links.clone(),
                cursor: None,
                response: message.response.clone(),
            }),
            messages: vec![message],
            ..View::default()
        }
    }

    fn message() -> ChatMessage {
        ChatMessage {
            id: "m1".into(),
            session_id: "s1".into(),
            user_id: "local".into(),
            query: "What is entanglement?".into(),
            response: Some(response()),
            fetched_links: Some(FetchedLinks {
                query: "What is entanglement?".into(),
                results: vec![
                    SearchResultItem {
                        title: "Basics".into(),
                        url: "https://physics.example/a".into(),
                        content: None,
                    },
                    SearchResultItem {
                        title: "News".into(),
                        url: "https://news.example/b".into(),
                        content: None,
                    },
                ],
                total_results: None,
            }),
            error: None,
            stage: Stage::Final,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn link_reveal_shows_position_and_url() {
        plain();
        let view = view_with(message());
        let event = StageEvent::LinkRevealed {
            session_id: "s1".into(),
            message_id: MessageId::from("m1"),
            index: 1,
            link: view.messages[0].fetched_links.as_ref().unwrap().results[1].clone(),
        };
        assert_eq!(
            event_lines(&event, &view),
            vec!["  [2/2] News https://news.example/b"]
        );
    }

    #[test]
    fn final_answer_resolves_citations_and_notes_unresolved() {
        plain();
        let lines = answer_lines(&response());
        assert!(lines.contains(&"Particles stay linked [1] [Source 7].".to_string()));
        assert!(lines.contains(&"  [1] https://physics.example/a".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "note: unresolved citations [Source 7]"
        );
    }

    #[test]
    fn dwell_stages_render_their_section() {
        plain();
        let view = view_with(message());
        let entered = |stage| StageEvent::Entered {
            session_id: "s1".into(),
            message_id: "m1".into(),
            stage,
        };
        assert_eq!(
            event_lines(&entered(Stage::Subquestions), &view)[1],
            "  - What is it?"
        );
        assert_eq!(
            event_lines(&entered(Stage::Analysis), &view)[2],
            "    A correlation."
        );
        assert_eq!(
            event_lines(&entered(Stage::Synthesis), &view)[1],
            "  Sources agree."
        );
    }

    #[test]
    fn failed_history_shows_the_error() {
        plain();
        let mut failed = message();
        failed.response = None;
        failed.error = Some("upstream timeout".into());
        failed.stage = Stage::Error;
        assert_eq!(
            message_lines(&failed),
            vec!["> What is entanglement?", "error: upstream timeout"]
        );
    }

    #[test]
    fn abandoned_history_reads_as_unresolved() {
        plain();
        let mut abandoned = message();
        abandoned.response = None;
        abandoned.stage = Stage::GatheringLinks;
        assert_eq!(
            message_lines(&abandoned),
            vec![
                "> What is entanglement?",
                "(unresolved: interrupted during gatheringLinks)"
            ]
        );
    }

    #[test]
    fn active_session_is_marked() {
        plain();
        let sessions = vec![
            ChatSession {
                id: "s2".into(),
                user_id: "local".into(),
                created_at: "2026-01-02T00:00:00.000Z".into(),
                session_name: "Newer".into(),
            },
            ChatSession {
                id: "s1".into(),
                user_id: "local".into(),
                created_at: "2026-01-01T00:00:00.000Z".into(),
                session_name: "Older".into(),
            },
        ];
        let lines = session_lines(&sessions, Some(&"s1".into()));
        assert_eq!(lines[0], "   1. Newer 2026-01-02T00:00:00.000Z");
        assert_eq!(lines[1], "*  2. Older 2026-01-01T00:00:00.000Z");
    }
}

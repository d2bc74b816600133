// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query orchestrator: drives one submitted query through the timeline.
//!
//! A [`QueryRun`] is spawned per submission. It calls the backend, holds
//! the reveal and dwell delays, persists each milestone to the store, and
//! only then reports the transition to the assistant as a [`RunEvent`]
//! (write-then-advance). Every report carries the run's [`Ticket`]; the
//! assistant discards reports whose ticket is no longer current.
//!
//! Each run owns a [`CancellationToken`]. Once it fires the run stops at its
//! next suspension point and performs no further writes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use delve_core::{
    AiModel, AiResponse, DelveError, FetchedLinks, MessageId, MessagePatch, ResearchBackend,
    SessionId, SessionStore, Stage,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::timeline::{Timeline, TimelineEvent};

/// Identifies one run and the context it was launched in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Assistant generation at launch; bumped on every context change.
    pub generation: u64,
    pub session_id: SessionId,
    pub message_id: MessageId,
}

/// A transition reported by a run, after its milestone was persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum RunUpdate {
    /// Links arrived; `stage` is `gatheringLinks` (cursor 0) or, for an
    /// empty result set, `fetchingAiAnalysis`.
    LinksFetched { links: FetchedLinks, stage: Stage },
    /// The reveal cursor moved to `cursor`.
    LinkRevealed { cursor: usize },
    /// A stage was entered that carries no new data.
    StageEntered(Stage),
    /// The analysis arrived; the run is now in `subquestions`.
    AnalysisReceived(AiResponse),
    /// The message reached `final`.
    Completed,
    /// The message reached `error` with this user-visible message.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RunEvent {
    pub ticket: Ticket,
    pub update: RunUpdate,
}

/// Presentation delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub link_reveal: Duration,
    pub stage_dwell: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            link_reveal: Duration::from_millis(500),
            stage_dwell: Duration::from_millis(2000),
        }
    }
}

/// Outcome of one driver step.
enum Step {
    Advanced,
    Cancelled,
}

/// One query's trip through the timeline.
pub struct QueryRun {
    ticket: Ticket,
    query: String,
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn ResearchBackend>,
    model: watch::Receiver<AiModel>,
    pacing: Pacing,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<RunEvent>,
    timeline: Timeline,
    links: Option<FetchedLinks>,
    response: Option<AiResponse>,
}

impl QueryRun {
    /// Prepares a run for a message already persisted in `fetchingLinks`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticket: Ticket,
        query: String,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn ResearchBackend>,
        model: watch::Receiver<AiModel>,
        pacing: Pacing,
        cancel: CancellationToken,
        events: mpsc::UnboundedSender<RunEvent>,
    ) -> Self {
        let mut timeline = Timeline::new();
        // Idle always accepts a submission.
        let _ = timeline.apply(TimelineEvent::Submitted);
        Self {
            ticket,
            query,
            store,
            backend,
            model,
            pacing,
            cancel,
            events,
            timeline,
            links: None,
            response: None,
        }
    }

    /// Spawns the run onto the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.drive())
    }

    /// Drives the run until it reaches a terminal stage or is cancelled.
    pub async fn drive(mut self) {
        debug!(
            message_id = %self.ticket.message_id,
            generation = self.ticket.generation,
            "query run started"
        );
        loop {
            let step = match self.timeline.stage() {
                Stage::FetchingLinks => self.fetch_links().await,
                Stage::GatheringLinks => self.reveal_next_link().await,
                Stage::FetchingAiAnalysis => self.fetch_analysis().await,
                Stage::Subquestions | Stage::Analysis | Stage::Synthesis => self.dwell().await,
                Stage::Final => {
                    self.finish().await;
                    return;
                }
                Stage::Idle | Stage::Error => return,
            };
            match step {
                Ok(Step::Advanced) => {}
                Ok(Step::Cancelled) => {
                    debug!(
                        message_id = %self.ticket.message_id,
                        stage = %self.timeline.stage(),
                        "query run cancelled"
                    );
                    return;
                }
                Err(e) => {
                    self.fail(e).await;
                    return;
                }
            }
        }
    }

    /// Awaits `fut` unless the run is cancelled first.
    async fn guarded<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Writes a milestone. Failures are logged; the run carries on.
    async fn persist(&self, patch: MessagePatch) -> Step {
        match self
            .guarded(self.store.update_message(&self.ticket.message_id, &patch))
            .await
        {
            None => Step::Cancelled,
            Some(Ok(())) => Step::Advanced,
            Some(Err(e)) => {
                warn!(
                    message_id = %self.ticket.message_id,
                    error = %e,
                    "failed to persist message milestone"
                );
                Step::Advanced
            }
        }
    }

    fn report(&self, update: RunUpdate) {
        if self.cancel.is_cancelled() {
            return;
        }
        let event = RunEvent {
            ticket: self.ticket.clone(),
            update,
        };
        if self.events.send(event).is_err() {
            debug!(message_id = %self.ticket.message_id, "assistant gone; dropping run update");
        }
    }

    async fn fetch_links(&mut self) -> Result<Step, DelveError> {
        if self.links.is_none() {
            let Some(result) = self.guarded(self.backend.fetch_links(&self.query)).await else {
                return Ok(Step::Cancelled);
            };
            self.links = Some(result?);
        }
        let links = self.links.clone().unwrap_or_default();
        let stage = self.timeline.apply(TimelineEvent::LinksFetched {
            count: links.results.len(),
        })?;
        debug!(
            message_id = %self.ticket.message_id,
            results = links.results.len(),
            stage = %stage,
            "links fetched"
        );

        let patch = MessagePatch {
            stage: Some(stage),
            fetched_links: Some(links.clone()),
            ..MessagePatch::default()
        };
        if let Step::Cancelled = self.persist(patch).await {
            return Ok(Step::Cancelled);
        }
        self.report(RunUpdate::LinksFetched { links, stage });
        Ok(Step::Advanced)
    }

    async fn reveal_next_link(&mut self) -> Result<Step, DelveError> {
        if self
            .guarded(tokio::time::sleep(self.pacing.link_reveal))
            .await
            .is_none()
        {
            return Ok(Step::Cancelled);
        }
        let stage = self.timeline.apply(TimelineEvent::LinkRevealed)?;
        match self.timeline.cursor() {
            Some(cursor) => self.report(RunUpdate::LinkRevealed { cursor }),
            None => {
                if let Step::Cancelled = self.persist(MessagePatch::stage(stage)).await {
                    return Ok(Step::Cancelled);
                }
                self.report(RunUpdate::StageEntered(stage));
            }
        }
        Ok(Step::Advanced)
    }

    async fn fetch_analysis(&mut self) -> Result<Step, DelveError> {
        if self.response.is_none() {
            let model = *self.model.borrow();
            let links = self
                .links
                .clone()
                .unwrap_or_else(|| FetchedLinks::empty(&self.query));
            debug!(message_id = %self.ticket.message_id, %model, "requesting analysis");
            let Some(result) = self
                .guarded(self.backend.fetch_ai_analysis(model, &self.query, &links))
                .await
            else {
                return Ok(Step::Cancelled);
            };
            self.response = Some(result?);
        }
        let response = self.response.clone().unwrap_or_default();
        let stage = self.timeline.apply(TimelineEvent::AnalysisReceived)?;

        let patch = MessagePatch {
            stage: Some(stage),
            response: Some(response.clone()),
            ..MessagePatch::default()
        };
        if let Step::Cancelled = self.persist(patch).await {
            return Ok(Step::Cancelled);
        }
        self.report(RunUpdate::AnalysisReceived(response));
        Ok(Step::Advanced)
    }

    async fn dwell(&mut self) -> Result<Step, DelveError> {
        if self
            .guarded(tokio::time::sleep(self.pacing.stage_dwell))
            .await
            .is_none()
        {
            return Ok(Step::Cancelled);
        }
        let stage = self.timeline.apply(TimelineEvent::DwellElapsed)?;
        if stage != Stage::Final {
            if let Step::Cancelled = self.persist(MessagePatch::stage(stage)).await {
                return Ok(Step::Cancelled);
            }
            self.report(RunUpdate::StageEntered(stage));
        }
        Ok(Step::Advanced)
    }

    async fn finish(&mut self) {
        if let Step::Cancelled = self.persist(MessagePatch::stage(Stage::Final)).await {
            return;
        }
        info!(message_id = %self.ticket.message_id, "query completed");
        self.report(RunUpdate::Completed);
    }

    async fn fail(&mut self, error: DelveError) {
        let message = error.to_string();
        if let Err(e) = self.timeline.apply(TimelineEvent::Failed) {
            debug!(error = %e, "failure outside a pending stage");
        }
        warn!(
            message_id = %self.ticket.message_id,
            error = %message,
            "query failed"
        );
        if let Step::Cancelled = self.persist(MessagePatch::failed(message.clone())).await {
            return;
        }
        self.report(RunUpdate::Failed(message));
    }
}

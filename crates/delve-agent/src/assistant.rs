// SPDX-FileCopyrightText: 2026 Delve Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The assistant actor: single owner of all mutable assistant state.
//!
//! Callers talk to it through an [`AssistantHandle`]. Commands are
//! processed one at a time; query runs report back over an internal
//! channel and are accepted only while their [`Ticket`] is current. A
//! ticket goes stale when its message leaves the pending slot or when the
//! context changes (session switch, new chat, sign-in, sign-out), which
//! also cancels the run.
//!
//! State is published as a [`View`] on a watch channel, and stage changes
//! as [`StageEvent`]s on a broadcast channel. The view is always updated
//! before the events that describe it are sent.

use std::sync::Arc;

use delve_config::DelveConfig;
use delve_core::types::AuthUser;
use delve_core::{
    AiModel, ChatMessage, ChatSession, DelveError, MessageId, MessagePatch, ResearchBackend,
    SessionId, SessionStore, Stage, ValidationError,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::orchestrator::{Pacing, QueryRun, RunEvent, RunUpdate, Ticket};
use crate::session_manager::{SessionManager, now_rfc3339};
use crate::view::{CurrentQuery, StageEvent, View};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

/// Settings the assistant reads from [`DelveConfig`].
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub pacing: Pacing,
    pub placeholder_name: String,
    pub name_max_chars: usize,
    pub model: AiModel,
}

impl AssistantConfig {
    pub fn from_config(config: &DelveConfig) -> Self {
        Self {
            pacing: Pacing {
                link_reveal: config.pacing.link_reveal(),
                stage_dwell: config.pacing.stage_dwell(),
            },
            placeholder_name: config.session.placeholder_name.clone(),
            name_max_chars: config.session.name_max_chars,
            model: config.model.selected,
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self::from_config(&DelveConfig::default())
    }
}

enum Command {
    SignIn {
        user: AuthUser,
        reply: oneshot::Sender<Result<Vec<ChatSession>, DelveError>>,
    },
    SignOut {
        reply: oneshot::Sender<()>,
    },
    Submit {
        query: String,
        reply: oneshot::Sender<Result<Ticket, DelveError>>,
    },
    NewChat {
        reply: oneshot::Sender<Result<ChatSession, DelveError>>,
    },
    SelectSession {
        id: SessionId,
        reply: oneshot::Sender<Result<bool, DelveError>>,
    },
    RefreshSessions {
        reply: oneshot::Sender<Result<Vec<ChatSession>, DelveError>>,
    },
    SelectModel {
        model: AiModel,
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a running assistant.
#[derive(Clone)]
pub struct AssistantHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<View>,
    events: broadcast::Sender<StageEvent>,
}

impl AssistantHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DelveError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| DelveError::Internal("assistant has stopped".into()))?;
        rx.await
            .map_err(|_| DelveError::Internal("assistant dropped the request".into()))
    }

    /// Signs `user` in and returns their sessions, newest first.
    pub async fn sign_in(&self, user: AuthUser) -> Result<Vec<ChatSession>, DelveError> {
        self.request(|reply| Command::SignIn { user, reply }).await?
    }

    /// Cancels in-flight work and discards all state.
    pub async fn sign_out(&self) -> Result<(), DelveError> {
        self.request(|reply| Command::SignOut { reply }).await
    }

    /// Submits a query into the active session, creating one if needed.
    pub async fn submit(&self, query: &str) -> Result<Ticket, DelveError> {
        let query = query.to_string();
        self.request(|reply| Command::Submit { query, reply })
            .await?
    }

    /// Starts a new chat and makes it active.
    pub async fn new_chat(&self) -> Result<ChatSession, DelveError> {
        self.request(|reply| Command::NewChat { reply }).await?
    }

    /// Activates `id`. Returns `false` when it was already active.
    pub async fn select_session(&self, id: &SessionId) -> Result<bool, DelveError> {
        let id = id.clone();
        self.request(|reply| Command::SelectSession { id, reply })
            .await?
    }

    /// Reloads the session list from the store.
    pub async fn refresh_sessions(&self) -> Result<Vec<ChatSession>, DelveError> {
        self.request(|reply| Command::RefreshSessions { reply })
            .await?
    }

    /// Selects the model used by the next analysis request.
    pub async fn select_model(&self, model: AiModel) -> Result<(), DelveError> {
        self.request(|reply| Command::SelectModel { model, reply })
            .await
    }

    /// Cancels in-flight work and stops the actor.
    pub async fn shutdown(&self) -> Result<(), DelveError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// Current snapshot.
    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    /// Subscribes to stage events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.events.subscribe()
    }
}

/// The actor behind an [`AssistantHandle`].
pub struct Assistant {
    pacing: Pacing,
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn ResearchBackend>,
    sessions: SessionManager,
    messages: Vec<ChatMessage>,
    pending: Option<MessageId>,
    current: Option<CurrentQuery>,
    generation: u64,
    run_cancel: Option<CancellationToken>,
    outbox: Vec<StageEvent>,
    model: watch::Sender<AiModel>,
    view: watch::Sender<View>,
    events: broadcast::Sender<StageEvent>,
    run_tx: mpsc::UnboundedSender<RunEvent>,
    run_rx: mpsc::UnboundedReceiver<RunEvent>,
    commands: mpsc::Receiver<Command>,
}

impl Assistant {
    /// Spawns the actor on the current runtime and returns its handle.
    pub fn spawn(
        config: AssistantConfig,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn ResearchBackend>,
    ) -> AssistantHandle {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (run_tx, run_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (model, _) = watch::channel(config.model);
        let (view, view_rx) = watch::channel(View {
            model: config.model,
            ..View::default()
        });

        let assistant = Assistant {
            pacing: config.pacing,
            sessions: SessionManager::new(
                store.clone(),
                &config.placeholder_name,
                config.name_max_chars,
            ),
            store,
            backend,
            messages: Vec::new(),
            pending: None,
            current: None,
            generation: 0,
            run_cancel: None,
            outbox: Vec::new(),
            model,
            view,
            events: events.clone(),
            run_tx,
            run_rx,
            commands,
        };
        tokio::spawn(assistant.run());

        AssistantHandle {
            commands: command_tx,
            view: view_rx,
            events,
        }
    }

    async fn run(mut self) {
        debug!("assistant started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.cancel_run();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.cancel_run();
                        break;
                    }
                },
                Some(event) = self.run_rx.recv() => self.handle_run_event(event),
            }
        }
        debug!("assistant stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SignIn { user, reply } => {
                let result = self.sign_in(user).await;
                self.publish();
                let _ = reply.send(result);
            }
            Command::SignOut { reply } => {
                self.reset_context();
                self.sessions.sign_out();
                self.publish();
                let _ = reply.send(());
            }
            Command::Submit { query, reply } => {
                let result = self.submit(&query).await;
                self.publish();
                let _ = reply.send(result);
            }
            Command::NewChat { reply } => {
                let result = self.new_chat().await;
                self.publish();
                let _ = reply.send(result);
            }
            Command::SelectSession { id, reply } => {
                let result = self.select_session(&id).await;
                self.publish();
                let _ = reply.send(result);
            }
            Command::RefreshSessions { reply } => {
                let result = self.sessions.list_sessions().await.map(|s| s.to_vec());
                self.publish();
                let _ = reply.send(result);
            }
            Command::SelectModel { model, reply } => {
                self.model.send_replace(model);
                info!(%model, "model selected");
                self.publish();
                let _ = reply.send(());
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Cancels the run in flight and invalidates every outstanding ticket.
    fn reset_context(&mut self) {
        self.cancel_run();
        self.generation += 1;
        self.pending = None;
        self.current = None;
        self.messages.clear();
    }

    fn cancel_run(&mut self) {
        if let Some(token) = self.run_cancel.take() {
            token.cancel();
        }
    }

    async fn sign_in(&mut self, user: AuthUser) -> Result<Vec<ChatSession>, DelveError> {
        self.reset_context();
        self.sessions.sign_out();
        Ok(self.sessions.sign_in(user.id).await?.to_vec())
    }

    async fn submit(&mut self, query: &str) -> Result<Ticket, DelveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        let user_id = self
            .sessions
            .user()
            .cloned()
            .ok_or(ValidationError::NotAuthenticated)?;
        if self.pending.is_some() {
            return Err(ValidationError::QueryInFlight.into());
        }

        let session_id = match self.sessions.active() {
            Some(id) => id.clone(),
            None => {
                let session = self.sessions.create_session(None).await?;
                self.messages.clear();
                session.id
            }
        };

        let message = ChatMessage {
            id: MessageId(uuid::Uuid::new_v4().to_string()),
            session_id: session_id.clone(),
            user_id,
            query: query.to_string(),
            response: None,
            fetched_links: None,
            error: None,
            stage: Stage::FetchingLinks,
            created_at: now_rfc3339(),
        };
        self.store.insert_message(&message).await?;
        if self.messages.is_empty() {
            self.sessions
                .rename_on_first_message(&session_id, query)
                .await;
        }

        self.generation += 1;
        let ticket = Ticket {
            generation: self.generation,
            session_id,
            message_id: message.id.clone(),
        };
        let cancel = CancellationToken::new();
        QueryRun::new(
            ticket.clone(),
            query.to_string(),
            self.store.clone(),
            self.backend.clone(),
            self.model.subscribe(),
            self.pacing,
            cancel.clone(),
            self.run_tx.clone(),
        )
        .spawn();
        self.run_cancel = Some(cancel);

        self.pending = Some(message.id.clone());
        self.current = Some(CurrentQuery {
            message_id: message.id.clone(),
            query: query.to_string(),
            stage: Stage::FetchingLinks,
            links: None,
            cursor: None,
            response: None,
        });
        self.messages.push(message);
        self.outbox.push(StageEvent::Entered {
            session_id: ticket.session_id.clone(),
            message_id: ticket.message_id.clone(),
            stage: Stage::FetchingLinks,
        });
        info!(
            session_id = %ticket.session_id,
            message_id = %ticket.message_id,
            generation = ticket.generation,
            "query submitted"
        );
        Ok(ticket)
    }

    async fn new_chat(&mut self) -> Result<ChatSession, DelveError> {
        let session = self.sessions.create_session(None).await?;
        self.reset_context();
        Ok(session)
    }

    async fn select_session(&mut self, id: &SessionId) -> Result<bool, DelveError> {
        match self.sessions.select_session(id).await? {
            None => Ok(false),
            Some(history) => {
                self.reset_context();
                self.messages = history;
                Ok(true)
            }
        }
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
            && self.pending.as_ref() == Some(&ticket.message_id)
            && self.sessions.active() == Some(&ticket.session_id)
    }

    fn handle_run_event(&mut self, event: RunEvent) {
        let RunEvent { ticket, update } = event;
        if !self.is_current(&ticket) {
            debug!(
                message_id = %ticket.message_id,
                generation = ticket.generation,
                current_generation = self.generation,
                "discarding stale run update"
            );
            return;
        }
        let Some(current) = self.current.as_mut() else {
            return;
        };
        let session_id = ticket.session_id.clone();
        let message_id = ticket.message_id.clone();
        let entered = |stage| StageEvent::Entered {
            session_id: session_id.clone(),
            message_id: message_id.clone(),
            stage,
        };

        let patch = match update {
            RunUpdate::LinksFetched { links, stage } => {
                current.stage = stage;
                current.links = Some(links.clone());
                current.cursor = (stage == Stage::GatheringLinks).then_some(0);
                self.outbox.push(entered(stage));
                if let Some(link) = current.revealed_link() {
                    self.outbox.push(StageEvent::LinkRevealed {
                        session_id: session_id.clone(),
                        message_id: message_id.clone(),
                        index: 0,
                        link: link.clone(),
                    });
                }
                MessagePatch {
                    stage: Some(stage),
                    fetched_links: Some(links),
                    ..MessagePatch::default()
                }
            }
            RunUpdate::LinkRevealed { cursor } => {
                current.cursor = Some(cursor);
                if let Some(link) = current.revealed_link() {
                    self.outbox.push(StageEvent::LinkRevealed {
                        session_id: session_id.clone(),
                        message_id: message_id.clone(),
                        index: cursor,
                        link: link.clone(),
                    });
                }
                MessagePatch::default()
            }
            RunUpdate::StageEntered(stage) => {
                current.stage = stage;
                current.cursor = None;
                self.outbox.push(entered(stage));
                MessagePatch::stage(stage)
            }
            RunUpdate::AnalysisReceived(response) => {
                current.stage = Stage::Subquestions;
                current.cursor = None;
                current.response = Some(response.clone());
                self.outbox.push(entered(Stage::Subquestions));
                MessagePatch {
                    stage: Some(Stage::Subquestions),
                    response: Some(response),
                    ..MessagePatch::default()
                }
            }
            RunUpdate::Completed => {
                self.outbox.push(entered(Stage::Final));
                MessagePatch::stage(Stage::Final)
            }
            RunUpdate::Failed(message) => {
                self.outbox.push(StageEvent::Failed {
                    session_id: session_id.clone(),
                    message_id: message_id.clone(),
                    message: message.clone(),
                });
                MessagePatch::failed(message)
            }
        };

        if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
            patch.apply_to(message);
        }
        if patch.stage.is_some_and(Stage::is_terminal) {
            self.pending = None;
            self.current = None;
            self.run_cancel = None;
            debug!(message_id = %message_id, "pending marker cleared");
        }
        self.publish();
    }

    fn publish(&mut self) {
        let view = View {
            user: self.sessions.user().cloned(),
            sessions: self.sessions.sessions().to_vec(),
            active_session: self.sessions.active().cloned(),
            messages: self.messages.clone(),
            pending: self.pending.clone(),
            current: self.current.clone(),
            model: *self.model.borrow(),
        };
        self.view.send_replace(view);
        for event in self.outbox.drain(..) {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

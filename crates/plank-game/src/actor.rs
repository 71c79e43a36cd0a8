//! Session actor: an isolated Tokio task that owns one game session.
//!
//! Every session key gets at most one live actor. The actor drains its
//! command queue one command at a time, so engine calls, storage writes and
//! broadcasts for a session never interleave. While it is initializing,
//! later commands simply wait their turn in the queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use plank_protocol::{ConnectedInfo, ParticipantId, ServerFrame, SessionKey};
use plank_store::{PersistedSession, StateStore};
use plank_transport::ConnectionId;
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::{ActorConfig, ActorPhase, EngineFactory, GameEngine, GameError};

/// Channel sender for delivering frames to one connection's writer.
///
/// Bounded: the actor never waits on a slow reader, it drops the
/// connection instead.
pub type FrameSender = mpsc::Sender<ServerFrame>;

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    /// Create the session: build the engine, persist metadata and the
    /// initial state.
    Initialize {
        participant_id: ParticipantId,
        display_name: String,
        reply: oneshot::Sender<Result<SessionKey, GameError>>,
    },

    /// Admit an authenticated connection. Triggers rehydration if needed.
    Connect {
        conn_id: ConnectionId,
        participant_id: ParticipantId,
        sender: FrameSender,
        reply: oneshot::Sender<Result<ConnectedInfo, GameError>>,
    },

    /// Feed one action to the engine.
    Action {
        conn_id: ConnectionId,
        participant_id: ParticipantId,
        action: Value,
    },

    /// Stop broadcasting to a connection.
    Disconnect { conn_id: ConnectionId },

    /// Request actor metadata.
    Info { reply: oneshot::Sender<SessionInfo> },

    /// Drop the in-memory state and stop.
    Evict,
}

/// A snapshot of actor metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_key: SessionKey,
    pub phase: ActorPhase,
    /// Number of connections currently receiving broadcasts.
    pub connections: usize,
    /// The game kind, once an engine is resident.
    pub display_name: Option<String>,
    /// The participant who created the session, once known.
    pub creator: Option<ParticipantId>,
}

/// Handle to a running session actor.
///
/// Cheap to clone. Every method fails with [`GameError::Unavailable`] once
/// the actor has stopped; callers retry on a fresh instance from the
/// [`ActorRegistry`](crate::ActorRegistry).
#[derive(Clone)]
pub struct SessionHandle {
    session_key: SessionKey,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// Returns `true` once the actor behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Returns `true` if both handles address the same actor instance.
    pub fn same_instance(&self, other: &SessionHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Creates the session with a fresh engine.
    ///
    /// Fails with [`GameError::AlreadyInitialized`] if the session already
    /// exists, in memory or in storage.
    pub async fn initialize(
        &self,
        participant_id: ParticipantId,
        display_name: String,
    ) -> Result<SessionKey, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            SessionCommand::Initialize {
                participant_id,
                display_name,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await?
    }

    /// Admits a connection. On success the `connected` frame has already
    /// been queued on `sender`, ahead of any broadcast.
    pub async fn connect(
        &self,
        conn_id: ConnectionId,
        participant_id: ParticipantId,
        sender: FrameSender,
    ) -> Result<ConnectedInfo, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            SessionCommand::Connect {
                conn_id,
                participant_id,
                sender,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await?
    }

    /// Queues an action (fire-and-forget). Waits only if the queue is full.
    pub async fn send_action(
        &self,
        conn_id: ConnectionId,
        participant_id: ParticipantId,
        action: Value,
    ) -> Result<(), GameError> {
        self.send(SessionCommand::Action {
            conn_id,
            participant_id,
            action,
        })
        .await
    }

    /// Removes a connection from the broadcast set.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Result<(), GameError> {
        self.send(SessionCommand::Disconnect { conn_id }).await
    }

    /// Requests the current actor metadata.
    pub async fn info(&self) -> Result<SessionInfo, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(SessionCommand::Info { reply: reply_tx }, reply_rx)
            .await
    }

    /// Tells the actor to stop after the commands already queued.
    pub async fn evict(&self) -> Result<(), GameError> {
        self.send(SessionCommand::Evict).await
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), GameError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| GameError::Unavailable(self.session_key.clone()))
    }

    async fn request<T>(
        &self,
        cmd: SessionCommand,
        reply: oneshot::Receiver<T>,
    ) -> Result<T, GameError> {
        self.send(cmd).await?;
        reply
            .await
            .map_err(|_| GameError::Unavailable(self.session_key.clone()))
    }
}

/// Engine plus current state, present only while the actor is ready.
struct Resident<E> {
    engine: E,
    display_name: String,
    creator: ParticipantId,
    state: Value,
}

struct Member {
    participant_id: ParticipantId,
    sender: FrameSender,
}

enum Flow {
    Continue,
    Stop,
}

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor<F: EngineFactory, S: StateStore> {
    session_key: SessionKey,
    phase: ActorPhase,
    factory: Arc<F>,
    store: Arc<S>,
    resident: Option<Resident<F::Engine>>,
    /// Broadcast set, keyed per connection so one participant can hold
    /// several streams.
    connections: HashMap<ConnectionId, Member>,
    idle_timeout: Option<Duration>,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl<F: EngineFactory, S: StateStore> SessionActor<F, S> {
    /// Runs the actor loop until eviction, idle timeout, or a fatal error.
    async fn run(mut self) {
        tracing::debug!(session_key = %self.session_key, "session actor started");

        while let Some(cmd) = self.next_command().await {
            if let Flow::Stop = self.handle(cmd).await {
                break;
            }
        }

        self.transition(ActorPhase::Evicted);
        tracing::info!(
            session_key = %self.session_key,
            connections = self.connections.len(),
            "session actor stopped"
        );
    }

    async fn next_command(&mut self) -> Option<SessionCommand> {
        match self.idle_timeout {
            Some(idle) if self.connections.is_empty() => {
                match tokio::time::timeout(idle, self.receiver.recv()).await {
                    Ok(cmd) => cmd,
                    Err(_) => {
                        tracing::info!(session_key = %self.session_key, "idle, evicting");
                        None
                    }
                }
            }
            _ => self.receiver.recv().await,
        }
    }

    async fn handle(&mut self, cmd: SessionCommand) -> Flow {
        match cmd {
            SessionCommand::Initialize {
                participant_id,
                display_name,
                reply,
            } => {
                let result = self.handle_initialize(participant_id, display_name).await;
                self.reply(reply, result)
            }
            SessionCommand::Connect {
                conn_id,
                participant_id,
                sender,
                reply,
            } => {
                let result = self.handle_connect(conn_id, participant_id, sender).await;
                self.reply(reply, result)
            }
            SessionCommand::Action {
                conn_id,
                participant_id,
                action,
            } => match self.handle_action(conn_id, participant_id, action).await {
                Ok(()) => Flow::Continue,
                Err(e) => self.fail(&e),
            },
            SessionCommand::Disconnect { conn_id } => {
                self.handle_disconnect(conn_id);
                Flow::Continue
            }
            SessionCommand::Info { reply } => {
                let _ = reply.send(self.info());
                Flow::Continue
            }
            SessionCommand::Evict => {
                tracing::info!(session_key = %self.session_key, "eviction requested");
                Flow::Stop
            }
        }
    }

    /// Sends `result` back to the caller. A fatal error is reported as
    /// [`GameError::ActorFailed`] and stops the actor. So does any failure
    /// that leaves no session resident; the next request for the key spawns
    /// a fresh instance.
    ///
    /// The queue is closed before replying, so the caller already sees the
    /// handle as closed.
    fn reply<T>(
        &mut self,
        reply: oneshot::Sender<Result<T, GameError>>,
        result: Result<T, GameError>,
    ) -> Flow {
        match result {
            Err(e) if e.is_fatal() => {
                let flow = self.fail(&e);
                self.receiver.close();
                let _ = reply.send(Err(GameError::ActorFailed {
                    key: self.session_key.clone(),
                    reason: e.to_string(),
                }));
                flow
            }
            Err(e) if self.resident.is_none() => {
                tracing::debug!(
                    session_key = %self.session_key,
                    error = %e,
                    "no session resident, stopping"
                );
                self.receiver.close();
                let _ = reply.send(Err(e));
                Flow::Stop
            }
            other => {
                let _ = reply.send(other);
                Flow::Continue
            }
        }
    }

    fn fail(&self, err: &GameError) -> Flow {
        tracing::error!(
            session_key = %self.session_key,
            error = %err,
            "session actor failed"
        );
        Flow::Stop
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    async fn handle_initialize(
        &mut self,
        participant_id: ParticipantId,
        display_name: String,
    ) -> Result<SessionKey, GameError> {
        if self.resident.is_some() {
            return Err(GameError::AlreadyInitialized(self.session_key.clone()));
        }
        // A cold instance may front a session an earlier instance created.
        if PersistedSession::load(&*self.store, &self.session_key)
            .await?
            .is_some()
        {
            return Err(GameError::AlreadyInitialized(self.session_key.clone()));
        }

        self.transition(ActorPhase::Initializing);
        let result = self.create(participant_id, display_name).await;
        self.settle(&result);
        result.map(|()| self.session_key.clone())
    }

    async fn create(
        &mut self,
        participant_id: ParticipantId,
        display_name: String,
    ) -> Result<(), GameError> {
        let mut engine = self.factory.create(&display_name)?;
        PersistedSession::save_metadata(
            &*self.store,
            &self.session_key,
            &display_name,
            &participant_id,
        )
        .await?;
        let state = engine.initial_state();
        PersistedSession::save_state(&*self.store, &self.session_key, &state).await?;

        tracing::info!(
            session_key = %self.session_key,
            %display_name,
            %participant_id,
            "session created"
        );
        self.resident = Some(Resident {
            engine,
            display_name,
            creator: participant_id,
            state,
        });
        Ok(())
    }

    /// Rehydrates from storage unless an engine is already resident.
    async fn ensure_ready(&mut self) -> Result<(), GameError> {
        if self.resident.is_some() {
            return Ok(());
        }
        self.transition(ActorPhase::Initializing);
        let result = self.rehydrate().await;
        self.settle(&result);
        result
    }

    async fn rehydrate(&mut self) -> Result<(), GameError> {
        let Some(persisted) = PersistedSession::load(&*self.store, &self.session_key).await?
        else {
            return Err(GameError::NotFound(self.session_key.clone()));
        };
        let engine = self.factory.create(&persisted.display_name)?;

        tracing::info!(
            session_key = %self.session_key,
            display_name = %persisted.display_name,
            "session rehydrated"
        );
        self.resident = Some(Resident {
            engine,
            display_name: persisted.display_name,
            creator: persisted.participant_id,
            state: persisted.state,
        });
        Ok(())
    }

    fn settle<T>(&mut self, result: &Result<T, GameError>) {
        let next = if result.is_ok() {
            ActorPhase::Ready
        } else {
            ActorPhase::Cold
        };
        self.transition(next);
    }

    fn transition(&mut self, next: ActorPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(
                session_key = %self.session_key,
                from = %self.phase,
                to = %next,
                "unexpected phase transition"
            );
        }
        self.phase = next;
    }

    // -----------------------------------------------------------------------
    // Connections and actions
    // -----------------------------------------------------------------------

    async fn handle_connect(
        &mut self,
        conn_id: ConnectionId,
        participant_id: ParticipantId,
        sender: FrameSender,
    ) -> Result<ConnectedInfo, GameError> {
        self.ensure_ready().await?;
        let Some(resident) = &self.resident else {
            return Err(GameError::NotFound(self.session_key.clone()));
        };

        let info = ConnectedInfo {
            display_name: resident.display_name.clone(),
            session_key: self.session_key.clone(),
            state: resident.state.clone(),
            participant_id: participant_id.clone(),
        };

        // The connected frame goes out before the connection can see any
        // broadcast.
        if sender.try_send(ServerFrame::Connected(info.clone())).is_err() {
            tracing::debug!(
                session_key = %self.session_key,
                %conn_id,
                "connection closed during admission"
            );
            return Ok(info);
        }
        self.connections.insert(
            conn_id,
            Member {
                participant_id: participant_id.clone(),
                sender,
            },
        );

        tracing::info!(
            session_key = %self.session_key,
            %participant_id,
            %conn_id,
            connections = self.connections.len(),
            "connection admitted"
        );
        Ok(info)
    }

    async fn handle_action(
        &mut self,
        conn_id: ConnectionId,
        participant_id: ParticipantId,
        action: Value,
    ) -> Result<(), GameError> {
        let emissions = match self.resident.as_mut() {
            Some(r) => r.engine.apply(&r.state, &participant_id, action),
            None => {
                tracing::warn!(
                    session_key = %self.session_key,
                    %conn_id,
                    "action before session is ready, ignoring"
                );
                return Ok(());
            }
        };

        tracing::debug!(
            session_key = %self.session_key,
            %participant_id,
            emissions = emissions.len(),
            "action applied"
        );

        // Each emission is committed before anyone sees it.
        for state in emissions {
            PersistedSession::save_state(&*self.store, &self.session_key, &state).await?;
            self.broadcast(&state);
            if let Some(r) = self.resident.as_mut() {
                r.state = state;
            }
        }
        Ok(())
    }

    fn handle_disconnect(&mut self, conn_id: ConnectionId) {
        if let Some(member) = self.connections.remove(&conn_id) {
            tracing::info!(
                session_key = %self.session_key,
                participant_id = %member.participant_id,
                %conn_id,
                connections = self.connections.len(),
                "connection left"
            );
        }
    }

    /// Sends a state frame to every connection. Connections whose writer is
    /// gone, or too far behind to take another frame, are dropped from the
    /// set; dropping the sender ends their stream.
    fn broadcast(&mut self, state: &Value) {
        let frame = ServerFrame::State(state.clone());
        let session_key = &self.session_key;
        self.connections.retain(|conn_id, member| {
            match member.sender.try_send(frame.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        %session_key,
                        %conn_id,
                        participant_id = %member.participant_id,
                        "connection fell behind, dropping"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(%session_key, %conn_id, "dropping closed connection");
                    false
                }
            }
        });
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            session_key: self.session_key.clone(),
            phase: self.phase,
            connections: self.connections.len(),
            display_name: self.resident.as_ref().map(|r| r.display_name.clone()),
            creator: self.resident.as_ref().map(|r| r.creator.clone()),
        }
    }
}

/// Spawns a session actor task in the `Cold` phase and returns its handle.
pub(crate) fn spawn_session<F: EngineFactory, S: StateStore>(
    session_key: SessionKey,
    factory: Arc<F>,
    store: Arc<S>,
    config: &ActorConfig,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);

    let actor = SessionActor {
        session_key: session_key.clone(),
        phase: ActorPhase::Cold,
        factory,
        store,
        resident: None,
        connections: HashMap::new(),
        idle_timeout: config.idle_timeout,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    SessionHandle {
        session_key,
        sender: tx,
    }
}

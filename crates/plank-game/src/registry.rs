//! Actor registry: maps session keys to live actor instances.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use plank_protocol::{ConnectedInfo, ParticipantId, SessionKey, generate_session_key};
use plank_store::StateStore;
use plank_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::actor::spawn_session;
use crate::{ActorConfig, EngineFactory, FrameSender, GameError, SessionHandle};

/// Routes requests to the single live actor for each session key,
/// creating instances on demand.
///
/// An entry whose actor has stopped (evicted, idle, or failed) is replaced
/// by a fresh `Cold` instance the next time the key is looked up. The fresh
/// instance rehydrates from the shared [`StateStore`].
pub struct ActorRegistry<F: EngineFactory, S: StateStore> {
    actors: Mutex<HashMap<SessionKey, SessionHandle>>,
    factory: Arc<F>,
    store: Arc<S>,
    config: ActorConfig,
}

impl<F: EngineFactory, S: StateStore> ActorRegistry<F, S> {
    pub fn new(factory: Arc<F>, store: Arc<S>, config: ActorConfig) -> Self {
        Self {
            actors: Mutex::new(HashMap::new()),
            factory,
            store,
            config,
        }
    }

    pub fn factory(&self) -> &Arc<F> {
        &self.factory
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    /// Returns the live actor for `key`, spawning a `Cold` one if there is
    /// none.
    pub async fn get_or_spawn(&self, key: &SessionKey) -> SessionHandle {
        let mut actors = self.actors.lock().await;
        if let Some(handle) = actors.get(key) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }
        self.spawn_into(&mut actors, key)
    }

    /// Replaces `stale` with a fresh instance, unless another caller already
    /// did. Only call this after `stale` reported [`GameError::Unavailable`].
    pub async fn replace_if_stale(&self, key: &SessionKey, stale: &SessionHandle) -> SessionHandle {
        let mut actors = self.actors.lock().await;
        if let Some(current) = actors.get(key) {
            if !current.same_instance(stale) && !current.is_closed() {
                return current.clone();
            }
        }
        self.spawn_into(&mut actors, key)
    }

    fn spawn_into(
        &self,
        actors: &mut HashMap<SessionKey, SessionHandle>,
        key: &SessionKey,
    ) -> SessionHandle {
        let handle = spawn_session(
            key.clone(),
            Arc::clone(&self.factory),
            Arc::clone(&self.store),
            &self.config,
        );
        actors.insert(key.clone(), handle.clone());
        tracing::debug!(session_key = %key, resident = actors.len(), "actor spawned");
        handle
    }

    /// Runs `op` against the actor for `key`. If that instance turns out to
    /// be gone, runs it once more on a fresh instance. An instance that
    /// stopped while failing the request is dropped from the map.
    async fn with_retry<T, Op, Fut>(&self, key: &SessionKey, op: Op) -> Result<T, GameError>
    where
        Op: Fn(SessionHandle) -> Fut,
        Fut: Future<Output = Result<T, GameError>>,
    {
        let handle = self.get_or_spawn(key).await;
        let (handle, result) = match op(handle.clone()).await {
            Err(GameError::Unavailable(_)) => {
                tracing::debug!(session_key = %key, "actor instance gone, retrying");
                let fresh = self.replace_if_stale(key, &handle).await;
                let result = op(fresh.clone()).await;
                (fresh, result)
            }
            other => (handle, other),
        };
        if result.is_err() {
            self.forget_if_stopped(key, &handle).await;
        }
        result
    }

    async fn forget_if_stopped(&self, key: &SessionKey, handle: &SessionHandle) {
        if !handle.is_closed() {
            return;
        }
        let mut actors = self.actors.lock().await;
        if actors
            .get(key)
            .is_some_and(|current| current.same_instance(handle))
        {
            actors.remove(key);
            tracing::debug!(session_key = %key, resident = actors.len(), "stopped actor forgotten");
        }
    }

    /// Creates a new session under a freshly generated key.
    pub async fn create_session(
        &self,
        participant_id: ParticipantId,
        display_name: &str,
    ) -> Result<SessionKey, GameError> {
        let key = generate_session_key();
        self.initialize(&key, participant_id, display_name).await
    }

    /// Initializes the session `key`.
    pub async fn initialize(
        &self,
        key: &SessionKey,
        participant_id: ParticipantId,
        display_name: &str,
    ) -> Result<SessionKey, GameError> {
        self.with_retry(key, |handle| {
            let participant_id = participant_id.clone();
            let display_name = display_name.to_owned();
            async move { handle.initialize(participant_id, display_name).await }
        })
        .await
    }

    /// Admits a connection to `key`, returning the handle of the instance
    /// that admitted it.
    pub async fn connect(
        &self,
        key: &SessionKey,
        conn_id: ConnectionId,
        participant_id: ParticipantId,
        sender: FrameSender,
    ) -> Result<(SessionHandle, ConnectedInfo), GameError> {
        self.with_retry(key, |handle| {
            let participant_id = participant_id.clone();
            let sender = sender.clone();
            async move {
                let info = handle.connect(conn_id, participant_id, sender).await?;
                Ok((handle, info))
            }
        })
        .await
    }

    /// Asks the actor for `key` to stop. Returns `false` if none was
    /// resident.
    ///
    /// Advisory: commands already queued are still processed first, and the
    /// next request for `key` starts a fresh instance.
    pub async fn evict(&self, key: &SessionKey) -> bool {
        let handle = {
            let actors = self.actors.lock().await;
            match actors.get(key) {
                Some(handle) if !handle.is_closed() => handle.clone(),
                _ => return false,
            }
        };
        handle.evict().await.is_ok()
    }

    /// Asks every resident actor to stop. Used on server shutdown.
    pub async fn evict_all(&self) {
        let handles: Vec<SessionHandle> = self.actors.lock().await.drain().map(|(_, h)| h).collect();
        tracing::info!(count = handles.len(), "evicting all session actors");
        for handle in handles {
            let _ = handle.evict().await;
        }
    }

    /// Forgets entries whose actors have stopped. Returns how many were
    /// removed.
    pub async fn prune(&self) -> usize {
        let mut actors = self.actors.lock().await;
        let before = actors.len();
        actors.retain(|_, handle| !handle.is_closed());
        before - actors.len()
    }

    /// Returns the keys of all live actors.
    pub async fn resident_keys(&self) -> Vec<SessionKey> {
        self.actors
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns the number of live actors.
    pub async fn len(&self) -> usize {
        self.actors
            .lock()
            .await
            .values()
            .filter(|handle| !handle.is_closed())
            .count()
    }

    /// Returns `true` if no actor is live.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

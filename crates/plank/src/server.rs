//! `PlankServer` builder, shared state, and router.
//!
//! This ties the layers together: HTTP routes → auth → actor registry →
//! session actors → state store.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::Method;
use axum::routing::get;
use plank_auth::{CredentialConfig, CredentialStore, MemoryCredentialStore, NonceAuthenticator};
use plank_game::{ActorRegistry, EngineFactory};
use plank_protocol::{JsonCodec, SessionKey};
use plank_store::{Field, FileStateStore, MemoryStateStore, StateStore, StoreError};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{PlankError, ServerConfig, handler};

/// How often expired guest credentials are swept from memory.
const CREDENTIAL_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared server state passed to every handler.
pub struct AppState<F: EngineFactory, S: StateStore, C: CredentialStore> {
    pub(crate) registry: ActorRegistry<F, S>,
    pub(crate) credentials: Arc<C>,
    pub(crate) authenticator: NonceAuthenticator<C>,
    pub(crate) credential_config: CredentialConfig,
    pub(crate) codec: JsonCodec,
}

impl<F: EngineFactory, S: StateStore, C: CredentialStore> AppState<F, S, C> {
    pub fn new(
        registry: ActorRegistry<F, S>,
        credentials: Arc<C>,
        credential_config: CredentialConfig,
    ) -> Self {
        Self {
            registry,
            authenticator: NonceAuthenticator::new(Arc::clone(&credentials)),
            credentials,
            credential_config,
            codec: JsonCodec,
        }
    }

    pub fn registry(&self) -> &ActorRegistry<F, S> {
        &self.registry
    }

    pub fn credentials(&self) -> &Arc<C> {
        &self.credentials
    }
}

/// Builds the Plank HTTP router over `state`.
///
/// CORS is wide open: the browser client is served from a different
/// origin than the game server.
pub fn router<F, S, C>(state: Arc<AppState<F, S, C>>) -> Router
where
    F: EngineFactory,
    S: StateStore,
    C: CredentialStore,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(86400));

    Router::new()
        .route("/", get(handler::root))
        .route("/login/:kind", get(handler::login::<F, S, C>))
        .route(
            "/game/new/:name",
            get(handler::new_game::<F, S, C>).post(handler::new_game::<F, S, C>),
        )
        .route("/game/connect/:session_key", get(handler::connect::<F, S, C>))
        .fallback(handler::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Backing store
// ---------------------------------------------------------------------------

/// The state store a built server runs on, chosen by configuration.
pub enum BackingStore {
    Memory(MemoryStateStore),
    File(FileStateStore),
}

impl StateStore for BackingStore {
    async fn get(&self, key: &SessionKey, field: Field) -> Result<Option<String>, StoreError> {
        match self {
            Self::Memory(store) => store.get(key, field).await,
            Self::File(store) => store.get(key, field).await,
        }
    }

    async fn put(&self, key: &SessionKey, field: Field, value: String) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.put(key, field, value).await,
            Self::File(store) => store.put(key, field, value).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Plank server.
///
/// # Example
///
/// ```rust,ignore
/// use plank::prelude::*;
///
/// let engines = EngineRegistry::new().register("tictactoe", LogicEngine::<TicTacToe>::new);
/// let server = PlankServerBuilder::new()
///     .bind("0.0.0.0:2233")
///     .data_dir("./sessions")
///     .build(engines)
///     .await?;
/// server.run().await
/// ```
pub struct PlankServerBuilder {
    config: ServerConfig,
}

impl PlankServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Starts from a loaded configuration.
    pub fn from_config(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_address = addr.to_string();
        self
    }

    /// Persists sessions as files under `dir` instead of in memory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(dir.into());
        self
    }

    /// Sets how long guest nonces stay valid.
    pub fn guest_ttl_secs(mut self, secs: u64) -> Self {
        self.config.guest_ttl_secs = secs;
        self
    }

    /// Evicts actors that have been idle for `secs` seconds.
    pub fn idle_evict_secs(mut self, secs: u64) -> Self {
        self.config.idle_evict_secs = Some(secs);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Opens the state store, binds the listener, and returns a server
    /// ready to [`run`](PlankServer::run).
    pub async fn build<F: EngineFactory>(self, engines: F) -> Result<PlankServer<F>, PlankError> {
        let store = match &self.config.data_dir {
            Some(dir) => BackingStore::File(FileStateStore::open(dir).await?),
            None => {
                tracing::info!("no data directory configured, sessions live in memory");
                BackingStore::Memory(MemoryStateStore::new())
            }
        };

        let registry = ActorRegistry::new(
            Arc::new(engines),
            Arc::new(store),
            self.config.actor_config(),
        );
        let state = Arc::new(AppState::new(
            registry,
            Arc::new(MemoryCredentialStore::new()),
            self.config.credential_config(),
        ));

        let listener = TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!(addr = %listener.local_addr()?, "plank server bound");

        Ok(PlankServer { listener, state })
    }
}

impl Default for PlankServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

type ServerState<F> = AppState<F, BackingStore, MemoryCredentialStore>;

/// A bound Plank server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct PlankServer<F: EngineFactory> {
    listener: TcpListener,
    state: Arc<ServerState<F>>,
}

impl<F: EngineFactory> PlankServer<F> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns a router sharing this server's state, for in-process
    /// requests.
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    pub fn state(&self) -> &Arc<ServerState<F>> {
        &self.state
    }

    /// Serves until the process is terminated.
    pub async fn run(self) -> Result<(), PlankError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes, then evicts every session actor.
    pub async fn run_until<Fut>(self, shutdown: Fut) -> Result<(), PlankError>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("plank server running");

        let purge = tokio::spawn(purge_credentials(Arc::clone(&self.state.credentials)));
        let app = router(Arc::clone(&self.state));

        let result = axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        purge.abort();
        self.state.registry.evict_all().await;
        tracing::info!("plank server stopped");
        result.map_err(PlankError::from)
    }
}

async fn purge_credentials(credentials: Arc<MemoryCredentialStore>) {
    let mut ticker = tokio::time::interval(CREDENTIAL_PURGE_INTERVAL);
    loop {
        ticker.tick().await;
        let purged = credentials.purge_expired().await;
        if purged > 0 {
            tracing::debug!(purged, "expired guest credentials purged");
        }
    }
}

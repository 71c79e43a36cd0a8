//! # Plank
//!
//! A game server where every session is an actor.
//!
//! Each game session runs as its own task that owns the session's engine
//! and current state, persists every state change, and broadcasts it to
//! every participant connected to the session. Game developers implement
//! [`GameLogic`](plank_game::GameLogic) (or the untyped
//! [`GameEngine`](plank_game::GameEngine)) and Plank handles guest login,
//! session creation, live streams, persistence, and rehydration.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plank::prelude::*;
//!
//! # async fn run() -> Result<(), PlankError> {
//! // Register your engines by name, then:
//! let engines = EngineRegistry::new();
//! let server = PlankServerBuilder::new()
//!     .bind("127.0.0.1:2233")
//!     .build(engines)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, DEFAULT_BIND_ADDRESS, DEFAULT_GUEST_TTL_SECS, ServerConfig};
pub use error::PlankError;
pub use server::{AppState, BackingStore, PlankServer, PlankServerBuilder, router};

/// Installs the global `tracing` subscriber.
///
/// Honors `RUST_LOG`, falling back to `default_filter`.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub mod prelude {
    pub use plank_auth::{
        AuthError, Authenticator, CredentialConfig, CredentialStore, MemoryCredentialStore,
        NonceAuthenticator,
    };
    pub use plank_game::{
        ActorConfig, ActorPhase, ActorRegistry, EngineError, EngineFactory, EngineRegistry,
        GameEngine, GameError, GameLogic, LogicEngine, SessionHandle, SessionInfo,
    };
    pub use plank_protocol::{
        ClientFrame, Codec, ConnectedInfo, ErrorBody, GuestLogin, JsonCodec, Nonce,
        ParticipantId, ServerFrame, SessionCreated, SessionKey,
    };
    pub use plank_store::{FileStateStore, MemoryStateStore, PersistedSession, StateStore};
    pub use plank_transport::{Connection, ConnectionId, MemoryConnection, WebSocketConnection};

    pub use crate::{
        AppState, BackingStore, ConfigError, PlankError, PlankServer, PlankServerBuilder,
        ServerConfig, init_tracing, router,
    };
}

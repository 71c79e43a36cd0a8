//! Session actors for Plank.
//!
//! Each game session runs as an isolated Tokio task (actor model) that
//! owns the session's engine, its current state, and the set of
//! connections watching it.
//!
//! # Key types
//!
//! - [`GameEngine`] / [`EngineFactory`]: the contract game code implements
//! - [`GameLogic`] / [`LogicEngine`]: typed rules, adapted to the contract
//! - [`ActorRegistry`]: one live actor per session key, spawned on demand
//! - [`SessionHandle`]: sends commands to a running actor
//! - [`ActorPhase`]: lifecycle state machine
//! - [`ActorConfig`]: queue size and idle eviction

#![allow(async_fn_in_trait)]

mod actor;
mod config;
mod connection;
mod engine;
mod error;
mod registry;

pub use actor::{FrameSender, SessionHandle, SessionInfo};
pub use config::{ActorConfig, ActorPhase};
pub use engine::{EngineError, EngineFactory, EngineRegistry, GameEngine, GameLogic, LogicEngine};
pub use error::GameError;
pub use registry::ActorRegistry;

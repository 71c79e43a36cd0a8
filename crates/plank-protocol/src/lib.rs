//! Wire protocol for Plank.
//!
//! This crate defines what clients and servers say to each other:
//!
//! - **Identifiers** ([`SessionKey`], [`ParticipantId`], [`Nonce`]) and the
//!   random generators that mint them.
//! - **Frames** ([`ServerFrame`], [`ClientFrame`]): the JSON envelopes that
//!   travel over a session stream, plus the HTTP response bodies.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (frames) → Session actor (game state)
//! ```
//!
//! Game state and actions are opaque [`serde_json::Value`]s here. Only the
//! game engine knows their shape.

mod codec;
mod error;
mod ids;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use ids::{generate_nonce, generate_participant_id, generate_session_key};
pub use types::{
    ClientFrame, ConnectedInfo, ErrorBody, GuestLogin, Nonce, ParticipantId,
    ServerFrame, SessionCreated, SessionKey,
};

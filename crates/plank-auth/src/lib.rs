//! Guest credentials and nonce authentication for Plank.
//!
//! 1. **Issuance**: [`issue_guest`] mints a participant id and a nonce and
//!    records the pair in a [`CredentialStore`] with a TTL.
//! 2. **Lookup**: [`NonceAuthenticator`] (an [`Authenticator`]) turns a
//!    presented nonce back into a [`ParticipantId`](plank_protocol::ParticipantId)
//!    during connection admission.
//!
//! Expired nonces behave exactly like unknown ones: authentication fails
//! closed.

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod guest;
mod store;

pub use auth::{Authenticator, NonceAuthenticator, bearer_token};
pub use error::AuthError;
pub use guest::{CredentialConfig, GUEST_KIND, issue_guest};
pub use store::{CredentialStore, MemoryCredentialStore};

//! Unified error type for the Plank server.
//!
//! Every variant maps to an HTTP status. Clients get the same
//! `{"error": {"message", "status"}}` body they would see as a stream
//! error frame; internal details stay in the logs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use plank_auth::AuthError;
use plank_game::GameError;
use plank_protocol::{ErrorBody, ProtocolError};
use plank_store::StoreError;
use plank_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum PlankError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An unknown route or login kind.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl PlankError {
    /// The HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::BadRequest(_) => 400,
            Self::Auth(AuthError::MissingCredential | AuthError::UnknownNonce) => 403,
            Self::Auth(AuthError::Unavailable(_)) => 503,
            Self::Game(e) => e.status(),
            Self::Transport(_)
            | Self::Protocol(_)
            | Self::Store(_)
            | Self::Config(_)
            | Self::Io(_) => 500,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::NotFound(_) => "Not Found".to_string(),
            Self::BadRequest(reason) => reason.clone(),
            Self::Auth(AuthError::Unavailable(_)) => "Service unavailable".to_string(),
            Self::Auth(_) => "Forbidden".to_string(),
            Self::Game(e) => e.client_message().to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for PlankError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status >= 500 {
            tracing::error!(error = %self, status, "request failed");
        } else {
            tracing::debug!(error = %self, status, "request rejected");
        }

        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({ "error": ErrorBody::new(status, self.client_message()) });
        (code, Json(body)).into_response()
    }
}

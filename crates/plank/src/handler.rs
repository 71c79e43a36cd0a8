//! HTTP route handlers.
//!
//! Routes:
//!   `GET /`                          greeting
//!   `GET /login/:kind`               guest credentials
//!   `GET|POST /game/new/:name`       create a session (bearer auth)
//!   `GET /game/connect/:session_key` live session stream (WebSocket)

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use plank_auth::{
    AuthError, Authenticator, CredentialStore, GUEST_KIND, bearer_token, issue_guest,
};
use plank_game::EngineFactory;
use plank_protocol::{GuestLogin, ParticipantId, SessionCreated, SessionKey};
use plank_store::StateStore;
use plank_transport::WebSocketConnection;

use crate::PlankError;
use crate::server::AppState;

pub(crate) async fn root() -> &'static str {
    "Welcome to Plank."
}

pub(crate) async fn not_found() -> PlankError {
    PlankError::NotFound("route".into())
}

pub(crate) async fn login<F, S, C>(
    State(state): State<Arc<AppState<F, S, C>>>,
    Path(kind): Path<String>,
) -> Result<Json<GuestLogin>, PlankError>
where
    F: EngineFactory,
    S: StateStore,
    C: CredentialStore,
{
    if kind != GUEST_KIND {
        return Err(PlankError::NotFound(format!("login kind {kind}")));
    }
    let login = issue_guest(&*state.credentials, &state.credential_config).await?;
    Ok(Json(login))
}

pub(crate) async fn new_game<F, S, C>(
    State(state): State<Arc<AppState<F, S, C>>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SessionCreated>, PlankError>
where
    F: EngineFactory,
    S: StateStore,
    C: CredentialStore,
{
    let participant_id = authenticate(&state, &headers).await?;
    let session_key = state.registry.create_session(participant_id, &name).await?;
    Ok(Json(SessionCreated { session_key }))
}

/// Upgrades to a WebSocket and serves it against the session.
///
/// Authentication runs before the upgrade but its outcome is only acted
/// on inside the stream: a bad credential still gets a stream, carrying a
/// single 403 error frame.
pub(crate) async fn connect<F, S, C>(
    State(state): State<Arc<AppState<F, S, C>>>,
    Path(session_key): Path<String>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response
where
    F: EngineFactory,
    S: StateStore,
    C: CredentialStore,
{
    let Some(ws) = ws else {
        return (StatusCode::BAD_REQUEST, "Expected websocket").into_response();
    };

    let auth = authenticate(&state, &headers).await;

    // Browsers can only pass a credential as a subprotocol, and they close
    // the socket unless the server echoes it back.
    let ws = match subprotocol(&headers) {
        Some(protocol) => ws.protocols([protocol.to_owned()]),
        None => ws,
    };

    let key = SessionKey(session_key);
    ws.on_upgrade(move |socket| async move {
        let conn = WebSocketConnection::new(socket);
        if let Err(e) = state
            .registry
            .serve_connection(key, auth, conn, &state.codec)
            .await
        {
            tracing::warn!(error = %e, "session stream ended with error");
        }
    })
}

async fn authenticate<F, S, C>(
    state: &AppState<F, S, C>,
    headers: &HeaderMap,
) -> Result<ParticipantId, AuthError>
where
    F: EngineFactory,
    S: StateStore,
    C: CredentialStore,
{
    let token = credential(headers).ok_or(AuthError::MissingCredential)?;
    state.authenticator.authenticate(token).await
}

/// Picks the presented credential: a bearer token if there is one,
/// otherwise the first offered WebSocket subprotocol.
fn credential(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .or_else(|| subprotocol(headers))
}

fn subprotocol(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

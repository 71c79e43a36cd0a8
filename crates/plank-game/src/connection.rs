//! Serving one client stream against a session actor.
//!
//! Every stream is accepted first and judged second. An admission failure
//! is reported as a single error frame, after which the stream stays open
//! but inert until the client hangs up.

use plank_auth::AuthError;
use plank_protocol::{ClientFrame, Codec, ErrorBody, ParticipantId, ServerFrame, SessionKey};
use plank_store::StateStore;
use plank_transport::Connection;
use tokio::sync::mpsc;

use crate::{ActorRegistry, EngineFactory, GameError, SessionHandle};

impl<F: EngineFactory, S: StateStore> ActorRegistry<F, S> {
    /// Serves `conn` as a participant of session `key` until either side
    /// goes away.
    ///
    /// `auth` is the outcome of authenticating the stream's credential. On
    /// success the actor is made ready (rehydrating if needed), the
    /// `connected` frame is sent, and then every engine emission is
    /// forwarded while the client's `action` frames flow to the engine.
    /// Frames that are not valid `action` envelopes are ignored.
    ///
    /// Returns an error only for infrastructure failures; client-facing
    /// failures are delivered as error frames.
    pub async fn serve_connection<C, K>(
        &self,
        key: SessionKey,
        auth: Result<ParticipantId, AuthError>,
        conn: C,
        codec: &K,
    ) -> Result<(), GameError>
    where
        C: Connection,
        K: Codec,
    {
        let conn_id = conn.id();

        let participant_id = match auth {
            Ok(participant_id) => participant_id,
            Err(e) => {
                tracing::debug!(session_key = %key, %conn_id, error = %e, "stream not authenticated");
                return refuse(&conn, codec, &GameError::Forbidden(e)).await;
            }
        };

        let (tx, rx) = mpsc::channel(self.config().outbound_buffer.max(1));
        let handle = match self.connect(&key, conn_id, participant_id.clone(), tx).await {
            Ok((handle, _info)) => handle,
            Err(e) if !e.is_fatal() && e.status() < 500 => {
                tracing::debug!(session_key = %key, %conn_id, error = %e, "admission refused");
                return refuse(&conn, codec, &e).await;
            }
            Err(e) => {
                tracing::warn!(session_key = %key, %conn_id, error = %e, "admission failed");
                let _ = send_error(&conn, codec, &e).await;
                let _ = conn.close().await;
                return Err(e);
            }
        };

        tokio::select! {
            () = read_actions(&conn, codec, &handle, &participant_id) => {
                tracing::debug!(session_key = %key, %conn_id, "client went away");
            }
            () = write_frames(&conn, codec, rx) => {
                tracing::debug!(session_key = %key, %conn_id, "actor went away");
            }
        }

        let _ = handle.disconnect(conn_id).await;
        let _ = conn.close().await;
        Ok(())
    }
}

/// Forwards client `action` frames to the actor until the stream ends.
async fn read_actions<C: Connection, K: Codec>(
    conn: &C,
    codec: &K,
    handle: &SessionHandle,
    participant_id: &ParticipantId,
) {
    let conn_id = conn.id();
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv failed");
                return;
            }
        };

        let action = match codec.decode::<ClientFrame>(&data) {
            Ok(ClientFrame::Action(action)) => action,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ignoring malformed frame");
                continue;
            }
        };

        if handle
            .send_action(conn_id, participant_id.clone(), action)
            .await
            .is_err()
        {
            return;
        }
    }
}

/// Writes actor frames to the stream until the actor drops our sender,
/// either because it stopped or because this connection fell behind.
async fn write_frames<C: Connection, K: Codec>(
    conn: &C,
    codec: &K,
    mut rx: mpsc::Receiver<ServerFrame>,
) {
    while let Some(frame) = rx.recv().await {
        let bytes = match codec.encode(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(conn_id = %conn.id(), error = %e, "frame encode failed");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed");
            return;
        }
    }
}

/// Sends one error frame, then holds the stream open without acting on
/// anything the client sends.
async fn refuse<C: Connection, K: Codec>(
    conn: &C,
    codec: &K,
    err: &GameError,
) -> Result<(), GameError> {
    send_error(conn, codec, err).await?;
    while let Ok(Some(_)) = conn.recv().await {}
    Ok(())
}

async fn send_error<C: Connection, K: Codec>(
    conn: &C,
    codec: &K,
    err: &GameError,
) -> Result<(), GameError> {
    let frame = ServerFrame::Error(ErrorBody::new(err.status(), err.client_message()));
    let bytes = codec.encode(&frame)?;
    if let Err(e) = conn.send(&bytes).await {
        tracing::debug!(conn_id = %conn.id(), error = %e, "error frame not delivered");
    }
    Ok(())
}

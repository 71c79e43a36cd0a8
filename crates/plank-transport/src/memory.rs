//! In-process duplex connection.
//!
//! [`pair`] returns two connected ends; whatever one end sends, the other
//! receives. Closing (or dropping) one end makes the other's `recv` return
//! `Ok(None)`, exactly like a cleanly closed socket.

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, TransportError};

/// One end of an in-memory duplex pair.
pub struct MemoryConnection {
    id: ConnectionId,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

/// Creates a connected pair of in-memory connections.
pub fn pair() -> (MemoryConnection, MemoryConnection) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();

    let a = MemoryConnection {
        id: ConnectionId::next(),
        outbound: Mutex::new(Some(a_tx)),
        inbound: Mutex::new(b_rx),
    };
    let b = MemoryConnection {
        id: ConnectionId::next(),
        outbound: Mutex::new(Some(b_tx)),
        inbound: Mutex::new(a_rx),
    };
    (a, b)
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let guard = self.outbound.lock().await;
        let tx = guard.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed("local end closed".into())
        })?;
        tx.send(data.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed("remote end dropped".into())
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.outbound.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_in_both_directions() {
        let (a, b) = pair();

        a.send(b"ping").await.unwrap();
        assert_eq!(b.recv().await.unwrap().as_deref(), Some(&b"ping"[..]));

        b.send(b"pong").await.unwrap();
        assert_eq!(a.recv().await.unwrap().as_deref(), Some(&b"pong"[..]));
    }

    #[tokio::test]
    async fn test_close_ends_remote_recv() {
        let (a, b) = pair();
        a.close().await.unwrap();
        assert!(b.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (a, _b) = pair();
        a.close().await.unwrap();
        assert!(matches!(
            a.send(b"late").await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_drop_ends_remote_recv() {
        let (a, b) = pair();
        drop(a);
        assert!(b.recv().await.unwrap().is_none());
    }

    #[test]
    fn test_pair_ids_differ() {
        let (a, b) = pair();
        assert_ne!(a.id(), b.id());
    }
}

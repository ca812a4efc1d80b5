//! TCP relay link to the injector.
//!
//! The forwarder task owns the connection and drains the bounded key
//! queue filled by the dispatcher.  Backpressure on that queue stalls the
//! dispatcher when the forwarder cannot keep up, which is acceptable:
//! key events are tiny and rare compared to socket buffer sizes.
//!
//! A write failure here is session-ending.  The forwarder flips the
//! shared shutdown flag and exits; the dispatcher observes the flag and
//! unwinds.  No reconnection is attempted anywhere, a broken session
//! requires a fresh process.

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use waykvm_core::relay::encode_key_frame;
use waykvm_core::KeyEvent;

/// Errors on the relay link.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to connect to injector at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("relay connection failed: {0}")]
    Write(#[source] std::io::Error),
}

/// The forwarder half of the relay: consumes decoded key events and
/// performs the blocking writes toward the injector.
pub struct RelayForwarder {
    stream: TcpStream,
    shutdown_tx: watch::Sender<bool>,
}

impl RelayForwarder {
    /// Connects to the injector.  Failure here aborts startup.
    pub async fn connect(
        addr: &str,
        shutdown_tx: watch::Sender<bool>,
    ) -> Result<Self, RelayError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| RelayError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        info!(addr, "connected to injector");
        Ok(Self {
            stream,
            shutdown_tx,
        })
    }

    /// Drains `keys` until the queue closes, the shutdown flag flips, or
    /// a write fails.
    pub async fn run(mut self, mut keys: mpsc::Receiver<KeyEvent>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                maybe_key = keys.recv() => match maybe_key {
                    Some(event) => {
                        let frame = encode_key_frame(&event);
                        if let Err(e) = self.stream.write_all(&frame).await {
                            error!("relay write failed, ending session: {e}");
                            let _ = self.shutdown_tx.send(true);
                            return;
                        }
                        debug!(scan_code = event.scan_code, pressed = event.pressed, "key forwarded");
                    }
                    None => return,
                },
                _ = shutdown_rx.changed() => return,
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_forwarder_writes_two_byte_frames_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (shutdown_tx, _) = watch::channel(false);

        let forwarder = RelayForwarder::connect(&addr, shutdown_tx)
            .await
            .expect("connect failed");
        let (mut accepted, _) = listener.accept().await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(forwarder.run(rx));

        tx.send(KeyEvent { scan_code: 30, pressed: true }).await.unwrap();
        tx.send(KeyEvent { scan_code: 30, pressed: false }).await.unwrap();

        let mut buf = [0u8; 4];
        accepted.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [30, 1, 30, 0]);

        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_forwarder_signals_shutdown_on_broken_pipe() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let forwarder = RelayForwarder::connect(&addr, shutdown_tx)
            .await
            .expect("connect failed");
        let (accepted, _) = listener.accept().await.unwrap();
        drop(accepted);

        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(forwarder.run(rx));

        // Keep writing until the dead peer surfaces as a write error.
        let writer = tokio::spawn(async move {
            loop {
                if tx
                    .send(KeyEvent { scan_code: 1, pressed: true })
                    .await
                    .is_err()
                {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        });

        tokio::time::timeout(std::time::Duration::from_secs(5), shutdown_rx.changed())
            .await
            .expect("shutdown must be signalled")
            .expect("sender must be alive");
        assert!(*shutdown_rx.borrow());

        task.await.unwrap();
        writer.abort();
    }

    #[tokio::test]
    async fn test_connect_failure_is_a_connect_error() {
        let (shutdown_tx, _) = watch::channel(false);

        // Port 1 on localhost refuses connections.
        let result = RelayForwarder::connect("127.0.0.1:1", shutdown_tx).await;

        assert!(matches!(result, Err(RelayError::Connect { .. })));
    }
}

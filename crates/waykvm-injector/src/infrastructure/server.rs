//! TCP listener for relay frames.
//!
//! Accepts any number of client connections; each one gets its own task
//! that reads exactly [`FRAME_LEN`] bytes per frame until EOF.  Frames
//! that fail to decode and injections that fail on the device are logged
//! and dropped; the connection and the listener stay up.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use waykvm_core::relay::{decode_key_frame, FRAME_LEN};

use crate::application::inject::{InjectKeyUseCase, VirtualKeyboard};

/// Runs the accept loop forever (until the task is dropped).
pub async fn run_listener<K>(
    listener: TcpListener,
    use_case: Arc<Mutex<InjectKeyUseCase<K>>>,
) where
    K: VirtualKeyboard + Send + 'static,
{
    loop {
        match listener.accept().await {
            Ok((conn, peer)) => {
                info!(%peer, "relay client connected");
                let use_case = Arc::clone(&use_case);
                tokio::spawn(async move {
                    handle_connection(conn, use_case).await;
                    info!(%peer, "relay client disconnected");
                });
            }
            Err(e) => {
                warn!("error while accepting connection: {e}");
            }
        }
    }
}

/// Reads 2-byte frames off one connection until it closes.
async fn handle_connection<K>(mut conn: TcpStream, use_case: Arc<Mutex<InjectKeyUseCase<K>>>)
where
    K: VirtualKeyboard + Send + 'static,
{
    let mut frame = [0u8; FRAME_LEN];
    loop {
        match conn.read_exact(&mut frame).await {
            Ok(_) => {
                let key = match decode_key_frame(&frame) {
                    Ok(key) => key,
                    Err(e) => {
                        warn!("dropping undecodable frame: {e}");
                        continue;
                    }
                };
                let mut guard = use_case.lock().await;
                if let Err(e) = guard.handle_frame(key) {
                    error!(
                        scan_code = key.scan_code,
                        "key injection failed, dropping event: {e}"
                    );
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                warn!("relay read failed: {e}");
                break;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::recording::RecordingKeyboard;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    async fn wait_for_events(
        use_case: &Arc<Mutex<InjectKeyUseCase<RecordingKeyboard>>>,
        count: usize,
    ) -> Vec<(u16, bool)> {
        for _ in 0..100 {
            {
                let guard = use_case.lock().await;
                if guard.keyboard().events.len() >= count {
                    return guard.keyboard().events.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let guard = use_case.lock().await;
        guard.keyboard().events.clone()
    }

    #[tokio::test]
    async fn test_frames_are_replayed_in_order_on_the_keyboard() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let use_case = Arc::new(Mutex::new(InjectKeyUseCase::new(RecordingKeyboard::new())));
        let server = tokio::spawn(run_listener(listener, Arc::clone(&use_case)));

        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(&[30, 1, 30, 0, 16, 1]).await.unwrap();

        let events = wait_for_events(&use_case, 3).await;
        assert_eq!(events, vec![(30, true), (30, false), (16, true)]);

        server.abort();
    }

    #[tokio::test]
    async fn test_injection_failure_keeps_the_connection_alive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let keyboard = RecordingKeyboard {
            should_fail: true,
            ..RecordingKeyboard::new()
        };
        let use_case = Arc::new(Mutex::new(InjectKeyUseCase::new(keyboard)));
        let server = tokio::spawn(run_listener(listener, Arc::clone(&use_case)));

        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(&[30, 1]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(use_case.lock().await.injected(), 0);

        // Heal the device and confirm the same connection still works.
        {
            let mut guard = use_case.lock().await;
            guard.keyboard_mut().should_fail = false;
        }
        conn.write_all(&[16, 1]).await.unwrap();

        let events = wait_for_events(&use_case, 1).await;
        assert_eq!(events, vec![(16, true)]);

        server.abort();
    }

    #[tokio::test]
    async fn test_partial_frame_is_not_injected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let use_case = Arc::new(Mutex::new(InjectKeyUseCase::new(RecordingKeyboard::new())));
        let server = tokio::spawn(run_listener(listener, Arc::clone(&use_case)));

        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(&[30]).await.unwrap();
        drop(conn);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(use_case.lock().await.injected(), 0);

        server.abort();
    }
}

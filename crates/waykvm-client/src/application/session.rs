//! The dispatcher task.
//!
//! Owns the mutable [`ConnectionState`] exclusively: no other task ever
//! reads or writes it, so the connection record needs no locking.  The
//! session consumes raw chunks from the reader thread, splits them into
//! messages, routes each one, lets the state machine produce effects,
//! and executes those effects against the real sockets and the mapped
//! pool.
//!
//! ```text
//! reader thread ──chunks──▶ Session::run
//!                             ├─ MessageStream (framing + carry-over)
//!                             ├─ dispatch::route  (object_id, opcode)
//!                             ├─ ConnectionState  (pure transitions)
//!                             └─ effects: control-socket sends, render,
//!                                key queue pushes, shutdown
//! ```
//!
//! Decode and routing failures drop the offending message and continue;
//! send failures and terminal events end the session.

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use waykvm_core::{KeyEvent, MessageStream};

use crate::application::dispatch;
use crate::application::render;
use crate::application::state::{ConnectionState, Effect, EndReason};
use crate::infrastructure::compositor::{CompositorLink, SendError};
use crate::infrastructure::shm::ShmPool;

/// Errors that abort the session from inside the dispatcher.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Send(#[from] SendError),
}

/// The dispatcher task state: connection record, framing buffer, control
/// link, pixel pool, and the outbound key queue.
pub struct Session {
    state: ConnectionState,
    stream: MessageStream,
    link: CompositorLink,
    pool: ShmPool,
    keys: mpsc::Sender<KeyEvent>,
    shutdown_tx: watch::Sender<bool>,
}

impl Session {
    pub fn new(
        state: ConnectionState,
        link: CompositorLink,
        pool: ShmPool,
        keys: mpsc::Sender<KeyEvent>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            state,
            stream: MessageStream::new(),
            link,
            pool,
            keys,
            shutdown_tx,
        }
    }

    /// Runs the dispatch loop until a terminal condition.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when a control-socket send fails; every
    /// protocol-level ending (display error, toplevel close, lost
    /// connection, dead relay) is an `Ok` with its [`EndReason`].
    pub async fn run(
        mut self,
        mut chunks: mpsc::Receiver<Vec<u8>>,
    ) -> Result<EndReason, SessionError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let opening = self.state.start();
        if let Some(reason) = self.apply(opening).await? {
            return Ok(self.finish(reason));
        }

        loop {
            tokio::select! {
                maybe_chunk = chunks.recv() => match maybe_chunk {
                    Some(chunk) => {
                        if let Some(reason) = self.process_chunk(&chunk).await? {
                            return Ok(self.finish(reason));
                        }
                    }
                    None => {
                        warn!("compositor connection lost");
                        return Ok(self.finish(EndReason::ConnectionLost));
                    }
                },
                _ = shutdown_rx.changed() => {
                    return Ok(self.finish(EndReason::RelayClosed));
                }
            }
        }
    }

    /// Handles one reader chunk: framing, routing, transitions, and a
    /// single progress re-evaluation at the end.
    async fn process_chunk(
        &mut self,
        chunk: &[u8],
    ) -> Result<Option<EndReason>, SessionError> {
        self.stream.push_chunk(chunk);
        loop {
            match self.stream.next_message() {
                Ok(Some(message)) => {
                    let event =
                        match dispatch::route(&self.state, message.header, &message.payload) {
                            Ok(event) => event,
                            Err(e) => {
                                warn!(
                                    object_id = message.header.object_id,
                                    opcode = message.header.opcode,
                                    "dropping malformed message: {e}"
                                );
                                continue;
                            }
                        };
                    debug!(?event, "dispatching");
                    let effects = self.state.handle_event(event);
                    if let Some(reason) = self.apply(effects).await? {
                        return Ok(Some(reason));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("framing lost, discarding buffered bytes: {e}");
                    break;
                }
            }
        }

        // Re-evaluate opportunistic transitions exactly once per chunk;
        // binds can arrive in any order across reads.
        let effects = self.state.poll_progress();
        if let Some(reason) = self.apply(effects).await? {
            return Ok(Some(reason));
        }
        self.state.confirm_surface_attached();
        Ok(None)
    }

    /// Executes effects in order.  A `Shutdown` effect stops the batch
    /// immediately so nothing is sent after a terminal event.
    async fn apply(&mut self, effects: Vec<Effect>) -> Result<Option<EndReason>, SessionError> {
        for effect in effects {
            match effect {
                Effect::Submit(request) => {
                    self.link.send(&request.encode())?;
                }
                Effect::SubmitWithPoolFd(request) => {
                    self.link.send_with_fd(&request.encode(), self.pool.fd())?;
                }
                Effect::Render => {
                    render::fill_frame(self.pool.frame());
                }
                Effect::ForwardKey(event) => {
                    // Bounded queue: a slow forwarder stalls the
                    // dispatcher here rather than dropping input.
                    if self.keys.send(event).await.is_err() {
                        return Ok(Some(EndReason::RelayClosed));
                    }
                }
                Effect::Shutdown(reason) => return Ok(Some(reason)),
            }
        }
        Ok(None)
    }

    /// Signals the other tasks and reports how the session ended.
    fn finish(&self, reason: EndReason) -> EndReason {
        match &reason {
            EndReason::DisplayError(error) => warn!(
                object_id = error.object_id,
                code = error.code,
                "display error: {}",
                error.message
            ),
            EndReason::ToplevelClosed => info!("compositor closed the window"),
            EndReason::ConnectionLost => {}
            EndReason::RelayClosed => warn!("relay link closed"),
        }
        let _ = self.shutdown_tx.send(true);
        reason
    }
}

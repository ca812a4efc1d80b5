//! Control-socket link to the Wayland compositor.
//!
//! The compositor listens on a Unix stream socket at
//! `$XDG_RUNTIME_DIR/$WAYLAND_DISPLAY`.  Requests are plain writes of the
//! encoded message bytes; the single exception is pool creation, whose
//! backing file descriptor must ride the same send as ancillary
//! `SCM_RIGHTS` data, because a descriptor is a kernel resource and
//! cannot be serialised into the message body.
//!
//! Reads happen on a dedicated blocking thread that pushes raw chunks
//! onto a bounded channel; the dispatcher task consumes them.  The reader
//! never blocks on anything but the socket.

use std::io::{IoSlice, Read, Write};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::thread::JoinHandle;

use nix::sys::socket::{sendmsg, ControlMessage, MsgFlags};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Size of one reader buffer.  Matches the largest burst the compositor
/// sends in practice (initial registry dump plus keymap chatter).
const READ_CHUNK_SIZE: usize = 4096;

/// Errors while resolving or opening the control socket.  Fatal at
/// startup.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("XDG_RUNTIME_DIR is not set")]
    RuntimeDirUnset,

    #[error("WAYLAND_DISPLAY is not set")]
    DisplayUnset,

    #[error("failed to connect to compositor socket {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors on an established control socket.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("control socket write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("control socket descriptor-passing send failed: {0}")]
    Ancillary(#[from] nix::Error),
}

/// Resolves the control socket path from the environment.
pub fn socket_path() -> Result<PathBuf, ConnectError> {
    let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR").ok_or(ConnectError::RuntimeDirUnset)?;
    let display = std::env::var_os("WAYLAND_DISPLAY").ok_or(ConnectError::DisplayUnset)?;
    Ok(PathBuf::from(runtime_dir).join(display))
}

/// The connected control socket.
pub struct CompositorLink {
    stream: UnixStream,
}

impl CompositorLink {
    /// Connects to the socket the environment points at.
    pub fn connect() -> Result<Self, ConnectError> {
        let path = socket_path()?;
        let stream = UnixStream::connect(&path)
            .map_err(|source| ConnectError::Connect { path: path.clone(), source })?;
        debug!(path = %path.display(), "connected to compositor");
        Ok(Self { stream })
    }

    /// Writes one encoded message.
    pub fn send(&self, bytes: &[u8]) -> Result<(), SendError> {
        (&self.stream).write_all(bytes)?;
        Ok(())
    }

    /// Writes one encoded message with `fd` attached as `SCM_RIGHTS`
    /// ancillary data.  Used exactly once per session, for pool creation.
    pub fn send_with_fd(&self, bytes: &[u8], fd: BorrowedFd<'_>) -> Result<(), SendError> {
        let iov = [IoSlice::new(bytes)];
        let fds = [fd.as_raw_fd()];
        let cmsgs = [ControlMessage::ScmRights(&fds)];
        sendmsg::<()>(
            self.stream.as_raw_fd(),
            &iov,
            &cmsgs,
            MsgFlags::empty(),
            None,
        )?;
        Ok(())
    }

    /// Spawns the blocking reader thread.
    ///
    /// Each successful read is forwarded as one chunk on `chunks`; the
    /// channel applies backpressure when the dispatcher falls behind.
    /// The thread exits on EOF, on a read error, or once the dispatcher
    /// side of the channel is gone, and dropping its sender tells the
    /// dispatcher the connection is lost.
    pub fn spawn_reader(
        &self,
        chunks: mpsc::Sender<Vec<u8>>,
    ) -> std::io::Result<JoinHandle<()>> {
        let mut stream = self.stream.try_clone()?;
        std::thread::Builder::new()
            .name("compositor-reader".to_string())
            .spawn(move || loop {
                let mut buf = [0u8; READ_CHUNK_SIZE];
                match stream.read(&mut buf) {
                    Ok(0) => {
                        debug!("compositor closed the connection");
                        break;
                    }
                    Ok(n) => {
                        if chunks.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("compositor read failed: {e}");
                        break;
                    }
                }
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

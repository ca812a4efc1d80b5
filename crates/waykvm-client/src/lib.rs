//! waykvm-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does waykvm-client do?
//!
//! The client is the machine whose keyboard is being *shared*.  It talks
//! to the local Wayland compositor directly over the wire protocol, with
//! no protocol library in between:
//!
//! 1. Connects to `$XDG_RUNTIME_DIR/$WAYLAND_DISPLAY` and requests the
//!    global registry.
//! 2. Binds the compositor, shared-memory, window-management, seat, and
//!    shortcuts-inhibitor interfaces as the registry advertises them.
//! 3. Creates a toplevel window surface and walks it through the
//!    configure/ack/attach/commit handshake, backing it with a
//!    shared-memory pixel pool whose file descriptor is passed to the
//!    compositor as ancillary socket data.
//! 4. Receives the keyboard events the compositor delivers to the
//!    focused window and forwards each one to the remote injector as a
//!    2-byte relay frame over TCP.

/// Application layer: state machine, routing, rendering, session loop.
pub mod application;

/// Infrastructure layer: compositor socket, shared memory, relay, config.
pub mod infrastructure;

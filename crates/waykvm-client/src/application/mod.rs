//! Application layer for the capture client.
//!
//! `state` holds the pure connection state machine, `dispatch` routes raw
//! messages into state-machine events, `render` fills the pixel pool, and
//! `session` is the task that wires them to real sockets.

pub mod dispatch;
pub mod render;
pub mod session;
pub mod state;

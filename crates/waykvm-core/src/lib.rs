//! # waykvm-core
//!
//! Shared library for waykvm containing the Wayland wire-protocol codec,
//! domain entities, and the relay framing used between the capture client
//! and the remote injector.
//!
//! This crate is used by both the client and injector applications.
//! It has zero dependencies on OS APIs, sockets, or display servers.
//!
//! # Architecture overview
//!
//! waykvm is a one-way software KVM for keyboards: the client creates a
//! window on a Wayland compositor by speaking the wire protocol directly,
//! receives the keyboard events delivered to that window, and streams them
//! to a second machine where the injector replays them into a kernel
//! virtual keyboard.
//!
//! This crate (`waykvm-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel between client and compositor.
//!   Requests are encoded into the Wayland binary format (8-byte header +
//!   arguments) and inbound events are decoded back into typed structs.
//!
//! - **`domain`** – Pure entities with no OS dependencies: keyboard events
//!   and the surface geometry arithmetic that sizes the pixel pool.
//!
//! - **`relay`** – The 2-byte frame format carrying each key press/release
//!   from the client to the injector over TCP.

pub mod domain;
pub mod protocol;
pub mod relay;

// Re-export the most-used types at the crate root so callers can write
// `waykvm_core::KeyEvent` instead of `waykvm_core::domain::input::KeyEvent`.
pub use domain::geometry::SurfaceGeometry;
pub use domain::input::{KeyEvent, KeyModifiers};
pub use protocol::events::{DisplayError, GlobalDescriptor};
pub use protocol::object_id::ObjectIdAllocator;
pub use protocol::requests::Request;
pub use protocol::wire::{MessageHeader, MessageStream, WireError, DISPLAY_OBJECT_ID, HEADER_SIZE};

//! Wayland wire protocol: header codec, opcode tables, request encoders,
//! event decoders, and object-ID allocation.

pub mod events;
pub mod object_id;
pub mod ops;
pub mod requests;
pub mod wire;

pub use events::{DisplayError, GlobalDescriptor};
pub use object_id::ObjectIdAllocator;
pub use requests::Request;
pub use wire::{MessageHeader, MessageStream, WireError};

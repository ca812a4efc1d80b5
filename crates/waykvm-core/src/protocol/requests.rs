//! Outbound request encoding.
//!
//! Every request the client ever sends is a [`Request`] variant; `encode`
//! produces its exact wire image.  Requests that create a protocol object
//! carry the pre-allocated `new_id` so the caller controls allocation
//! order (see [`super::object_id::ObjectIdAllocator`]).
//!
//! The one transport-level special case is [`Request::CreatePool`]: its
//! backing file descriptor is not part of the message bytes at all and
//! must travel as ancillary data on the same send.

use super::ops;
use super::wire::{MessageBuilder, DISPLAY_OBJECT_ID};

/// An outbound protocol request, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Asks the display singleton for the global registry.
    GetRegistry { new_id: u32 },
    /// Binds a registry global to a fresh object ID.
    Bind {
        registry: u32,
        numeric_name: u32,
        interface: String,
        version: u32,
        new_id: u32,
    },
    /// Creates a surface from the compositor.
    CreateSurface { compositor: u32, new_id: u32 },
    /// Wraps a surface in an xdg_surface.
    GetXdgSurface {
        wm_base: u32,
        new_id: u32,
        surface: u32,
    },
    /// Assigns the toplevel role to an xdg_surface.
    GetToplevel { xdg_surface: u32, new_id: u32 },
    /// Sets the toplevel's title.
    SetTitle { toplevel: u32, title: String },
    /// Sets the toplevel's application ID.
    SetAppId { toplevel: u32, app_id: String },
    /// Commits pending surface state.
    Commit { surface: u32 },
    /// Answers a wm_base ping, echoing its serial.
    Pong { wm_base: u32, serial: u32 },
    /// Acknowledges an xdg_surface configure, echoing its serial.
    AckConfigure { xdg_surface: u32, serial: u32 },
    /// Creates a shared-memory pool of `size` bytes.  The pool's file
    /// descriptor is passed out-of-band by the transport.
    CreatePool { shm: u32, new_id: u32, size: i32 },
    /// Creates a pixel buffer viewing the pool at offset 0.
    CreateBuffer {
        pool: u32,
        new_id: u32,
        width: i32,
        height: i32,
        stride: i32,
        format: u32,
    },
    /// Attaches a buffer to a surface at the origin.
    Attach { surface: u32, buffer: u32 },
    /// Requests the keyboard object of a seat.
    GetKeyboard { seat: u32, new_id: u32 },
    /// Requests a shortcuts inhibitor for a surface/seat pair.
    InhibitShortcuts {
        manager: u32,
        new_id: u32,
        surface: u32,
        seat: u32,
    },
}

impl Request {
    /// Encodes the request into its wire bytes, header included.
    ///
    /// The size field is derived from the bytes actually written, never
    /// computed separately.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Request::GetRegistry { new_id } => {
                MessageBuilder::new(DISPLAY_OBJECT_ID, ops::WL_DISPLAY_GET_REGISTRY)
                    .put_u32(*new_id)
                    .finish()
            }
            Request::Bind {
                registry,
                numeric_name,
                interface,
                version,
                new_id,
            } => MessageBuilder::new(*registry, ops::WL_REGISTRY_BIND)
                .put_u32(*numeric_name)
                .put_string(interface)
                .put_u32(*version)
                .put_u32(*new_id)
                .finish(),
            Request::CreateSurface { compositor, new_id } => {
                MessageBuilder::new(*compositor, ops::WL_COMPOSITOR_CREATE_SURFACE)
                    .put_u32(*new_id)
                    .finish()
            }
            Request::GetXdgSurface {
                wm_base,
                new_id,
                surface,
            } => MessageBuilder::new(*wm_base, ops::XDG_WM_BASE_GET_XDG_SURFACE)
                .put_u32(*new_id)
                .put_u32(*surface)
                .finish(),
            Request::GetToplevel { xdg_surface, new_id } => {
                MessageBuilder::new(*xdg_surface, ops::XDG_SURFACE_GET_TOPLEVEL)
                    .put_u32(*new_id)
                    .finish()
            }
            Request::SetTitle { toplevel, title } => {
                MessageBuilder::new(*toplevel, ops::XDG_TOPLEVEL_SET_TITLE)
                    .put_string(title)
                    .finish()
            }
            Request::SetAppId { toplevel, app_id } => {
                MessageBuilder::new(*toplevel, ops::XDG_TOPLEVEL_SET_APP_ID)
                    .put_string(app_id)
                    .finish()
            }
            Request::Commit { surface } => {
                MessageBuilder::new(*surface, ops::WL_SURFACE_COMMIT).finish()
            }
            Request::Pong { wm_base, serial } => {
                MessageBuilder::new(*wm_base, ops::XDG_WM_BASE_PONG)
                    .put_u32(*serial)
                    .finish()
            }
            Request::AckConfigure { xdg_surface, serial } => {
                MessageBuilder::new(*xdg_surface, ops::XDG_SURFACE_ACK_CONFIGURE)
                    .put_u32(*serial)
                    .finish()
            }
            Request::CreatePool { shm, new_id, size } => {
                MessageBuilder::new(*shm, ops::WL_SHM_CREATE_POOL)
                    .put_u32(*new_id)
                    .put_i32(*size)
                    .finish()
            }
            Request::CreateBuffer {
                pool,
                new_id,
                width,
                height,
                stride,
                format,
            } => MessageBuilder::new(*pool, ops::WL_SHM_POOL_CREATE_BUFFER)
                .put_u32(*new_id)
                .put_i32(0)
                .put_i32(*width)
                .put_i32(*height)
                .put_i32(*stride)
                .put_u32(*format)
                .finish(),
            Request::Attach { surface, buffer } => {
                MessageBuilder::new(*surface, ops::WL_SURFACE_ATTACH)
                    .put_u32(*buffer)
                    .put_i32(0)
                    .put_i32(0)
                    .finish()
            }
            Request::GetKeyboard { seat, new_id } => {
                MessageBuilder::new(*seat, ops::WL_SEAT_GET_KEYBOARD)
                    .put_u32(*new_id)
                    .finish()
            }
            Request::InhibitShortcuts {
                manager,
                new_id,
                surface,
                seat,
            } => MessageBuilder::new(*manager, ops::ZWP_INHIBIT_MANAGER_INHIBIT_SHORTCUTS)
                .put_u32(*new_id)
                .put_u32(*surface)
                .put_u32(*seat)
                .finish(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::{MessageHeader, HEADER_SIZE};

    fn header_of(bytes: &[u8]) -> MessageHeader {
        MessageHeader::decode(bytes).expect("valid header")
    }

    #[test]
    fn test_get_registry_targets_display_object() {
        let bytes = Request::GetRegistry { new_id: 2 }.encode();

        let header = header_of(&bytes);
        assert_eq!(header.object_id, DISPLAY_OBJECT_ID);
        assert_eq!(header.opcode, ops::WL_DISPLAY_GET_REGISTRY);
        assert_eq!(header.size as usize, HEADER_SIZE + 4);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
    }

    #[test]
    fn test_bind_layout_name_string_version_new_id() {
        let bytes = Request::Bind {
            registry: 2,
            numeric_name: 6,
            interface: "wl_shm".to_string(),
            version: 1,
            new_id: 4,
        }
        .encode();

        // name(4) + len(4) + "wl_shm\0" padded to 8 + version(4) + new_id(4)
        assert_eq!(header_of(&bytes).size as usize, HEADER_SIZE + 4 + 4 + 8 + 4 + 4);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 6);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 7);
        assert_eq!(&bytes[16..23], b"wl_shm\0");
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 4);
    }

    #[test]
    fn test_pong_echoes_serial_with_header_plus_four_size() {
        let bytes = Request::Pong {
            wm_base: 5,
            serial: 42,
        }
        .encode();

        let header = header_of(&bytes);
        assert_eq!(header.opcode, ops::XDG_WM_BASE_PONG);
        assert_eq!(header.size as usize, HEADER_SIZE + 4);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 42);
    }

    #[test]
    fn test_commit_has_no_arguments() {
        let bytes = Request::Commit { surface: 9 }.encode();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(header_of(&bytes).size as usize, HEADER_SIZE);
    }

    #[test]
    fn test_create_buffer_arguments_in_declared_order() {
        let bytes = Request::CreateBuffer {
            pool: 11,
            new_id: 12,
            width: 700,
            height: 700,
            stride: 2800,
            format: ops::FORMAT_XRGB8888,
        }
        .encode();

        assert_eq!(header_of(&bytes).size as usize, HEADER_SIZE + 6 * 4);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 12);
        assert_eq!(i32::from_le_bytes(bytes[12..16].try_into().unwrap()), 0);
        assert_eq!(i32::from_le_bytes(bytes[16..20].try_into().unwrap()), 700);
        assert_eq!(i32::from_le_bytes(bytes[20..24].try_into().unwrap()), 700);
        assert_eq!(i32::from_le_bytes(bytes[24..28].try_into().unwrap()), 2800);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 1);
    }

    #[test]
    fn test_attach_pins_buffer_at_origin() {
        let bytes = Request::Attach {
            surface: 9,
            buffer: 12,
        }
        .encode();

        assert_eq!(header_of(&bytes).size as usize, HEADER_SIZE + 12);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 12);
        assert_eq!(i32::from_le_bytes(bytes[12..16].try_into().unwrap()), 0);
        assert_eq!(i32::from_le_bytes(bytes[16..20].try_into().unwrap()), 0);
    }

    #[test]
    fn test_inhibit_shortcuts_carries_surface_then_seat() {
        let bytes = Request::InhibitShortcuts {
            manager: 14,
            new_id: 15,
            surface: 9,
            seat: 13,
        }
        .encode();

        assert_eq!(header_of(&bytes).size as usize, HEADER_SIZE + 12);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 15);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 9);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 13);
    }
}

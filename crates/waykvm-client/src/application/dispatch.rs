//! Routing of raw messages to state-machine events.
//!
//! Dispatch is keyed on the `(object_id, opcode)` pair.  Every arm is
//! explicit and the default is a typed [`SessionEvent::Unhandled`], so
//! new server behaviour surfaces in the logs instead of disappearing
//! into a silent fallthrough.

use waykvm_core::protocol::events;
use waykvm_core::protocol::ops;
use waykvm_core::{MessageHeader, WireError, DISPLAY_OBJECT_ID};

use super::state::{ConnectionState, SessionEvent};

/// Classifies one inbound message against the current connection state.
///
/// # Errors
///
/// Returns [`WireError`] when a recognised event has a malformed payload.
/// The caller logs it and drops the message; routing errors are never
/// fatal to the session.
pub fn route(
    state: &ConnectionState,
    header: MessageHeader,
    payload: &[u8],
) -> Result<SessionEvent, WireError> {
    let id = header.object_id;
    let opcode = header.opcode;

    match (id, opcode) {
        (DISPLAY_OBJECT_ID, ops::WL_DISPLAY_EVT_ERROR) => {
            events::decode_display_error(payload).map(SessionEvent::DisplayError)
        }
        (id, ops::WL_REGISTRY_EVT_GLOBAL) if id == state.registry && id != 0 => {
            events::decode_global(payload).map(SessionEvent::Global)
        }
        (id, ops::XDG_WM_BASE_EVT_PING) if id == state.wm_base && id != 0 => {
            events::decode_serial(payload).map(|serial| SessionEvent::Ping { serial })
        }
        (id, ops::XDG_SURFACE_EVT_CONFIGURE) if id == state.xdg_surface && id != 0 => {
            events::decode_serial(payload).map(|serial| SessionEvent::Configure { serial })
        }
        (id, ops::WL_SHM_EVT_FORMAT) if id == state.shm && id != 0 => {
            events::decode_serial(payload).map(|format| SessionEvent::ShmFormat { format })
        }
        (id, ops::XDG_TOPLEVEL_EVT_CONFIGURE) if id == state.toplevel && id != 0 => {
            Ok(SessionEvent::ToplevelConfigure)
        }
        (id, ops::XDG_TOPLEVEL_EVT_CLOSE) if id == state.toplevel && id != 0 => {
            Ok(SessionEvent::ToplevelClose)
        }
        // Any message on the keyboard object goes to the key decoder.
        (id, opcode) if id == state.keyboard && id != 0 => match opcode {
            ops::WL_KEYBOARD_EVT_KEY => events::decode_key_event(payload).map(SessionEvent::Key),
            ops::WL_KEYBOARD_EVT_MODIFIERS => {
                events::decode_modifiers(payload).map(SessionEvent::Modifiers)
            }
            other => Ok(SessionEvent::KeyboardOther { opcode: other }),
        },
        (id, opcode) if (id == state.inhibit_manager || id == state.inhibitor) && id != 0 => {
            Ok(SessionEvent::Inhibitor { opcode })
        }
        (object_id, opcode) => Ok(SessionEvent::Unhandled { object_id, opcode }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Inbound event payload decoding.
//!
//! Decoders take the argument bytes after the 8-byte header and return
//! typed values.  Every length check fails with
//! [`WireError::MalformedMessage`] rather than reading past the buffer;
//! a decode failure is never fatal to the session, the caller drops the
//! offending message and moves on.

use super::wire::{round_up_to_4, WireError};
use crate::domain::input::{KeyEvent, KeyModifiers};

/// One advertised registry global: the numeric name to bind with, the
/// interface string, and the advertised version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalDescriptor {
    pub numeric_name: u32,
    pub interface: String,
    pub version: u32,
}

/// A fatal error event from the display singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayError {
    /// Object the error occurred on.
    pub object_id: u32,
    /// Interface-specific error code.
    pub code: u32,
    /// Human-readable description supplied by the server.
    pub message: String,
}

// ── Decode helpers ────────────────────────────────────────────────────────────

fn require_len(payload: &[u8], needed: usize, context: &str) -> Result<(), WireError> {
    if payload.len() < needed {
        Err(WireError::MalformedMessage(format!(
            "{context}: need {needed} bytes, got {}",
            payload.len()
        )))
    } else {
        Ok(())
    }
}

fn read_u32(payload: &[u8], offset: usize) -> Result<u32, WireError> {
    require_len(payload, offset + 4, "u32 argument")?;
    Ok(u32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ]))
}

/// Reads a wire string at `offset`: 4-byte length including the NUL, the
/// bytes, zero padding to a 4-byte boundary.  Returns the string with the
/// NUL stripped and the offset just past the padding.
fn read_string(payload: &[u8], offset: usize, context: &str) -> Result<(String, usize), WireError> {
    let len = read_u32(payload, offset)? as usize;
    if len == 0 {
        return Err(WireError::MalformedMessage(format!(
            "{context}: string length must include the terminating NUL"
        )));
    }
    let padded = round_up_to_4(len as u32) as usize;
    let start = offset + 4;
    require_len(payload, start + padded, context)?;
    let bytes = &payload[start..start + len - 1];
    if payload[start + len - 1] != 0 {
        return Err(WireError::MalformedMessage(format!(
            "{context}: string is not NUL-terminated"
        )));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| WireError::MalformedMessage(format!("{context}: invalid UTF-8: {e}")))?
        .to_string();
    Ok((text, start + padded))
}

// ── Event decoders ────────────────────────────────────────────────────────────

/// Decodes a registry global announcement: numeric name, interface string
/// (NUL-terminated and padded on the wire), then the version.
pub fn decode_global(payload: &[u8]) -> Result<GlobalDescriptor, WireError> {
    let numeric_name = read_u32(payload, 0)?;
    let (interface, after) = read_string(payload, 4, "global interface")?;
    let version = read_u32(payload, after)?;
    Ok(GlobalDescriptor {
        numeric_name,
        interface,
        version,
    })
}

/// Extracts the serial argument of a ping or configure event.
pub fn decode_serial(payload: &[u8]) -> Result<u32, WireError> {
    read_u32(payload, 0)
}

/// Decodes a display error event: offending object, error code, message.
pub fn decode_display_error(payload: &[u8]) -> Result<DisplayError, WireError> {
    let object_id = read_u32(payload, 0)?;
    let code = read_u32(payload, 4)?;
    let (message, _) = read_string(payload, 8, "display error message")?;
    Ok(DisplayError {
        object_id,
        code,
        message,
    })
}

/// Decodes a keyboard key event from its fixed 16-byte payload:
/// serial, time, scan code, state (0 released, nonzero pressed).
///
/// # Errors
///
/// Any payload length other than 16 is a [`WireError::MalformedMessage`].
pub fn decode_key_event(payload: &[u8]) -> Result<KeyEvent, WireError> {
    if payload.len() != 16 {
        return Err(WireError::MalformedMessage(format!(
            "key event payload must be 16 bytes, got {}",
            payload.len()
        )));
    }
    let scan_code = read_u32(payload, 8)?;
    let state = read_u32(payload, 12)?;
    Ok(KeyEvent {
        scan_code,
        pressed: state != 0,
    })
}

/// Decodes a keyboard modifiers event from its fixed 20-byte payload:
/// serial, then the depressed/latched/locked masks and the layout group.
///
/// # Errors
///
/// Any payload length other than 20 is a [`WireError::MalformedMessage`].
pub fn decode_modifiers(payload: &[u8]) -> Result<KeyModifiers, WireError> {
    if payload.len() != 20 {
        return Err(WireError::MalformedMessage(format!(
            "modifiers payload must be 20 bytes, got {}",
            payload.len()
        )));
    }
    Ok(KeyModifiers {
        depressed: read_u32(payload, 4)?,
        latched: read_u32(payload, 8)?,
        locked: read_u32(payload, 12)?,
        group: read_u32(payload, 16)?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Relay framing between the capture client and the injector.
//!
//! Each key event crosses the TCP link as a fixed 2-byte frame:
//!
//! ```text
//! [scan_code:1][state:1]
//! ```
//!
//! `state` is 0 for a release and nonzero for a press.  The scan code is
//! narrowed to one byte; evdev codes above 255 cannot be represented and
//! are truncated (they do not occur on ordinary keyboards).

use thiserror::Error;

use crate::domain::input::KeyEvent;

/// Length of one relay frame in bytes.
pub const FRAME_LEN: usize = 2;

/// Errors raised while decoding relay frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayFrameError {
    #[error("relay frame must be {FRAME_LEN} bytes, got {0}")]
    WrongLength(usize),
}

/// A key event as the injector sees it: the narrowed scan code plus the
/// press/release flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayKey {
    pub scan_code: u8,
    pub pressed: bool,
}

/// Encodes a key event into its relay frame.
///
/// Scan codes above 255 lose their upper bits; the caller may want to log
/// when that happens.
pub fn encode_key_frame(event: &KeyEvent) -> [u8; FRAME_LEN] {
    if event.scan_code > u8::MAX as u32 {
        tracing::debug!(scan_code = event.scan_code, "scan code truncated to one byte");
    }
    [event.scan_code as u8, u8::from(event.pressed)]
}

/// Decodes a relay frame received by the injector.
pub fn decode_key_frame(frame: &[u8]) -> Result<RelayKey, RelayFrameError> {
    if frame.len() != FRAME_LEN {
        return Err(RelayFrameError::WrongLength(frame.len()));
    }
    Ok(RelayKey {
        scan_code: frame[0],
        pressed: frame[1] != 0,
    })
}

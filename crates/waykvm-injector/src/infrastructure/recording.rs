//! Recording virtual keyboard for tests.
//!
//! The real device requires `/dev/uinput` access and actually presses
//! keys on the test machine.  This fake records every call instead, so
//! listener tests can assert exactly what was injected and in what
//! order.

use crate::application::inject::{InjectionError, VirtualKeyboard};

/// Records `(scan_code, pressed)` pairs instead of touching a device.
#[derive(Debug, Default)]
pub struct RecordingKeyboard {
    /// Every call in arrival order.
    pub events: Vec<(u16, bool)>,
    /// When `true`, every call fails with a device error.  Use this to
    /// test error-handling paths in callers.
    pub should_fail: bool,
}

impl RecordingKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, scan_code: u16, pressed: bool) -> Result<(), InjectionError> {
        if self.should_fail {
            return Err(InjectionError::Device(std::io::Error::new(
                std::io::ErrorKind::Other,
                "recording keyboard set to fail",
            )));
        }
        self.events.push((scan_code, pressed));
        Ok(())
    }
}

impl VirtualKeyboard for RecordingKeyboard {
    fn press(&mut self, scan_code: u16) -> Result<(), InjectionError> {
        self.record(scan_code, true)
    }

    fn release(&mut self, scan_code: u16) -> Result<(), InjectionError> {
        self.record(scan_code, false)
    }
}

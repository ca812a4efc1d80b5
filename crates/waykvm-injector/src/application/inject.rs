//! InjectKeyUseCase: turns relay frames into virtual-keyboard calls.
//!
//! Sits at the application layer and delegates to a [`VirtualKeyboard`]
//! implementation in the infrastructure layer.  A failed injection is
//! reported to the caller, which logs it and keeps the connection alive;
//! a lost key must never take the whole listener down.

use thiserror::Error;

use waykvm_core::relay::RelayKey;

/// Error type for key injection operations.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The kernel device rejected the event.
    #[error("virtual keyboard write failed: {0}")]
    Device(#[source] std::io::Error),
}

/// Platform-agnostic virtual keyboard.
///
/// The production implementation writes to a uinput device; tests use a
/// recording fake or a mock.
#[cfg_attr(test, mockall::automock)]
pub trait VirtualKeyboard: Send {
    /// Presses the key with the given Linux scan code.
    fn press(&mut self, scan_code: u16) -> Result<(), InjectionError>;

    /// Releases the key with the given Linux scan code.
    fn release(&mut self, scan_code: u16) -> Result<(), InjectionError>;
}

/// The Inject Key use case: one decoded relay frame in, one device call
/// out.
pub struct InjectKeyUseCase<K: VirtualKeyboard> {
    keyboard: K,
    injected: u64,
}

impl<K: VirtualKeyboard> InjectKeyUseCase<K> {
    pub fn new(keyboard: K) -> Self {
        Self {
            keyboard,
            injected: 0,
        }
    }

    /// Replays one relay frame on the device.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError`] when the device write fails.
    pub fn handle_frame(&mut self, key: RelayKey) -> Result<(), InjectionError> {
        let result = if key.pressed {
            self.keyboard.press(key.scan_code as u16)
        } else {
            self.keyboard.release(key.scan_code as u16)
        };
        if result.is_ok() {
            self.injected += 1;
        }
        result
    }

    /// Number of successfully injected events, for diagnostics.
    pub fn injected(&self) -> u64 {
        self.injected
    }

    /// The underlying device, for test assertions.
    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }

    /// Mutable access to the underlying device.
    pub fn keyboard_mut(&mut self) -> &mut K {
        &mut self.keyboard
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressed_frame_calls_press_with_scan_code() {
        let mut keyboard = MockVirtualKeyboard::new();
        keyboard
            .expect_press()
            .withf(|code| *code == 30)
            .times(1)
            .returning(|_| Ok(()));
        let mut use_case = InjectKeyUseCase::new(keyboard);

        use_case
            .handle_frame(RelayKey {
                scan_code: 30,
                pressed: true,
            })
            .expect("injection failed");

        assert_eq!(use_case.injected(), 1);
    }

    #[test]
    fn test_release_frame_calls_release() {
        let mut keyboard = MockVirtualKeyboard::new();
        keyboard
            .expect_release()
            .withf(|code| *code == 30)
            .times(1)
            .returning(|_| Ok(()));
        let mut use_case = InjectKeyUseCase::new(keyboard);

        use_case
            .handle_frame(RelayKey {
                scan_code: 30,
                pressed: false,
            })
            .expect("injection failed");
    }

    #[test]
    fn test_device_failure_surfaces_and_is_not_counted() {
        let mut keyboard = MockVirtualKeyboard::new();
        keyboard.expect_press().returning(|_| {
            Err(InjectionError::Device(std::io::Error::new(
                std::io::ErrorKind::Other,
                "gone",
            )))
        });
        let mut use_case = InjectKeyUseCase::new(keyboard);

        let result = use_case.handle_frame(RelayKey {
            scan_code: 1,
            pressed: true,
        });

        assert!(result.is_err());
        assert_eq!(use_case.injected(), 0);
    }
}

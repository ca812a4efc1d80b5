//! Kernel virtual keyboard via uinput.
//!
//! Creates a virtual input device through `/dev/uinput` and emits key
//! events on it.  Relay scan codes are Linux evdev codes and are written
//! through unchanged; no translation table is needed on either side.
//!
//! Creating the device requires write access to `/dev/uinput`, which
//! usually means running as root or holding a udev rule for the `input`
//! group.  Creation failure is fatal: the whole point of the process is
//! this device.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use thiserror::Error;
use tracing::info;

use crate::application::inject::{InjectionError, VirtualKeyboard};

/// Errors while creating the virtual device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to create uinput keyboard: {0}")]
    Create(#[from] std::io::Error),
}

/// A uinput-backed virtual keyboard.
pub struct UinputKeyboard {
    device: VirtualDevice,
}

impl UinputKeyboard {
    /// Creates the device with every one-byte key code registered, so
    /// any scan code a relay frame can carry is injectable.
    pub fn create(name: &str) -> Result<Self, DeviceError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 1..=u8::MAX as u16 {
            keys.insert(Key::new(code));
        }
        let device = VirtualDeviceBuilder::new()?
            .name(name)
            .with_keys(&keys)?
            .build()?;
        info!(name, "virtual keyboard created");
        Ok(Self { device })
    }

    fn emit(&mut self, scan_code: u16, value: i32) -> Result<(), InjectionError> {
        let event = InputEvent::new(EventType::KEY, scan_code, value);
        self.device.emit(&[event]).map_err(InjectionError::Device)
    }
}

impl VirtualKeyboard for UinputKeyboard {
    fn press(&mut self, scan_code: u16) -> Result<(), InjectionError> {
        self.emit(scan_code, 1)
    }

    fn release(&mut self, scan_code: u16) -> Result<(), InjectionError> {
        self.emit(scan_code, 0)
    }
}

//! Keyboard event entities.

/// One key press or release, carrying the Linux evdev scan code the
/// compositor reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub scan_code: u32,
    pub pressed: bool,
}

/// Modifier state snapshot accompanying key events.
///
/// Decoded for diagnostics only; waykvm forwards raw scan codes and
/// leaves modifier interpretation to the receiving machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyModifiers {
    pub depressed: u32,
    pub latched: u32,
    pub locked: u32,
    pub group: u32,
}

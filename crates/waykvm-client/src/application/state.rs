//! The connection state machine.
//!
//! [`ConnectionState`] owns every bound object ID, the surface geometry,
//! and the ID allocator for the connection.  Its transition functions are
//! pure: [`handle_event`] and [`poll_progress`] mutate the record and
//! return a list of [`Effect`]s, and all I/O happens in the session task
//! that executes those effects.  That keeps the whole
//! unconfigured-to-rendering pipeline unit-testable without a socket.
//!
//! Object ID value 0 means "not yet bound" throughout.
//!
//! [`handle_event`]: ConnectionState::handle_event
//! [`poll_progress`]: ConnectionState::poll_progress

use tracing::debug;

use waykvm_core::protocol::ops;
use waykvm_core::{
    DisplayError, GlobalDescriptor, KeyEvent, KeyModifiers, ObjectIdAllocator, Request,
    SurfaceGeometry,
};

/// Title given to the toplevel window.
pub const WINDOW_TITLE: &str = "waykvm";

/// Application ID advertised to the compositor.
pub const APP_ID: &str = "dev.waykvm.client";

/// Where the surface stands in its configuration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigurationPhase {
    /// Nothing bound yet.
    Unconfigured,
    /// At least one interface of interest has been bound.
    InterfacesBinding,
    /// The surface pipeline requests have been issued.
    SurfaceCreated,
    /// The compositor's configure has been acknowledged.
    SurfaceConfigureAcked,
    /// A rendered buffer is attached and committed.
    SurfaceAttached,
}

/// Why the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The display singleton reported a fatal protocol error.
    DisplayError(DisplayError),
    /// The compositor asked the toplevel to close.
    ToplevelClosed,
    /// The compositor connection reached EOF or failed.
    ConnectionLost,
    /// The relay link to the injector is gone; input can no longer be
    /// delivered, so the session is over.
    RelayClosed,
}

/// A decoded inbound event, produced by the dispatcher's routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The registry advertised a global.
    Global(GlobalDescriptor),
    /// Fatal error event from the display.
    DisplayError(DisplayError),
    /// Liveness ping from the window manager base.
    Ping { serial: u32 },
    /// The xdg_surface wants its new state acknowledged.
    Configure { serial: u32 },
    /// The shared-memory factory advertised a pixel format.
    ShmFormat { format: u32 },
    /// The toplevel was reconfigured (size/state hints; unused here).
    ToplevelConfigure,
    /// The toplevel was asked to close.
    ToplevelClose,
    /// A key press or release on our keyboard object.
    Key(KeyEvent),
    /// Modifier state snapshot on our keyboard object.
    Modifiers(KeyModifiers),
    /// Some other event on the keyboard object (keymap, enter, leave…).
    KeyboardOther { opcode: u16 },
    /// Traffic on the shortcuts inhibitor objects.
    Inhibitor { opcode: u16 },
    /// Anything the routing table does not know.  Logged, never dropped
    /// silently.
    Unhandled { object_id: u32, opcode: u16 },
}

/// A side effect requested by the state machine, executed by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Encode and send a request on the control socket.
    Submit(Request),
    /// Same, but attach the shared-memory pool's file descriptor as
    /// ancillary data on the send.
    SubmitWithPoolFd(Request),
    /// Run the render pass over the mapped pool.
    Render,
    /// Push a decoded key event onto the outbound relay queue.
    ForwardKey(KeyEvent),
    /// Terminal condition: stop dispatching, send nothing further.
    Shutdown(EndReason),
}

/// Mutable per-connection record: bound object IDs, geometry, allocator,
/// and configuration phase.  Exactly one exists per running client and it
/// is owned by the dispatcher task alone.
#[derive(Debug)]
pub struct ConnectionState {
    pub ids: ObjectIdAllocator,
    pub geometry: SurfaceGeometry,
    pub phase: ConfigurationPhase,

    pub registry: u32,
    pub compositor: u32,
    pub shm: u32,
    pub wm_base: u32,
    pub seat: u32,
    pub inhibit_manager: u32,

    pub surface: u32,
    pub xdg_surface: u32,
    pub toplevel: u32,
    pub keyboard: u32,
    pub inhibitor: u32,
    pub pool: u32,
    pub buffer: u32,
}

impl ConnectionState {
    pub fn new(geometry: SurfaceGeometry) -> Self {
        Self {
            ids: ObjectIdAllocator::new(),
            geometry,
            phase: ConfigurationPhase::Unconfigured,
            registry: 0,
            compositor: 0,
            shm: 0,
            wm_base: 0,
            seat: 0,
            inhibit_manager: 0,
            surface: 0,
            xdg_surface: 0,
            toplevel: 0,
            keyboard: 0,
            inhibitor: 0,
            pool: 0,
            buffer: 0,
        }
    }

    /// Opens the conversation: allocates the registry ID and requests it
    /// from the display singleton.
    pub fn start(&mut self) -> Vec<Effect> {
        let new_id = self.ids.next();
        self.registry = new_id;
        vec![Effect::Submit(Request::GetRegistry { new_id })]
    }

    /// Advances the machine on one inbound event.
    pub fn handle_event(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::Global(global) => self.on_global(global),
            SessionEvent::DisplayError(error) => {
                vec![Effect::Shutdown(EndReason::DisplayError(error))]
            }
            SessionEvent::Ping { serial } => {
                // Answered whatever the configuration phase.
                vec![Effect::Submit(Request::Pong {
                    wm_base: self.wm_base,
                    serial,
                })]
            }
            SessionEvent::Configure { serial } => {
                self.phase = ConfigurationPhase::SurfaceConfigureAcked;
                vec![Effect::Submit(Request::AckConfigure {
                    xdg_surface: self.xdg_surface,
                    serial,
                })]
            }
            SessionEvent::ShmFormat { format } => {
                debug!(format, "pixel format advertised");
                Vec::new()
            }
            SessionEvent::ToplevelConfigure => {
                debug!("toplevel configure");
                Vec::new()
            }
            SessionEvent::ToplevelClose => vec![Effect::Shutdown(EndReason::ToplevelClosed)],
            SessionEvent::Key(event) => vec![Effect::ForwardKey(event)],
            SessionEvent::Modifiers(mods) => {
                debug!(?mods, "modifier state");
                Vec::new()
            }
            SessionEvent::KeyboardOther { opcode } => {
                debug!(opcode, "keyboard event without a handler");
                Vec::new()
            }
            SessionEvent::Inhibitor { opcode } => {
                debug!(opcode, "shortcuts inhibitor event");
                Vec::new()
            }
            SessionEvent::Unhandled { object_id, opcode } => {
                debug!(object_id, opcode, "unhandled event");
                Vec::new()
            }
        }
    }

    /// Re-evaluates the opportunistic transitions.  Called exactly once
    /// after each processed read, because binds can arrive in any order
    /// across reads.
    pub fn poll_progress(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();

        // Surface pipeline prerequisites: compositor, shm factory, and
        // window-manager base all bound, no surface yet.
        if self.compositor != 0 && self.shm != 0 && self.wm_base != 0 && self.surface == 0 {
            self.surface = self.ids.next();
            self.xdg_surface = self.ids.next();
            self.toplevel = self.ids.next();
            effects.push(Effect::Submit(Request::CreateSurface {
                compositor: self.compositor,
                new_id: self.surface,
            }));
            effects.push(Effect::Submit(Request::GetXdgSurface {
                wm_base: self.wm_base,
                new_id: self.xdg_surface,
                surface: self.surface,
            }));
            effects.push(Effect::Submit(Request::GetToplevel {
                xdg_surface: self.xdg_surface,
                new_id: self.toplevel,
            }));
            effects.push(Effect::Submit(Request::SetTitle {
                toplevel: self.toplevel,
                title: WINDOW_TITLE.to_string(),
            }));
            effects.push(Effect::Submit(Request::SetAppId {
                toplevel: self.toplevel,
                app_id: APP_ID.to_string(),
            }));
            effects.push(Effect::Submit(Request::Commit {
                surface: self.surface,
            }));
            self.phase = ConfigurationPhase::SurfaceCreated;
        }

        // Keyboard and inhibitor requests are independent of the surface
        // pipeline.
        if self.seat != 0 && self.keyboard == 0 {
            self.keyboard = self.ids.next();
            effects.push(Effect::Submit(Request::GetKeyboard {
                seat: self.seat,
                new_id: self.keyboard,
            }));
        }
        if self.inhibit_manager != 0
            && self.inhibitor == 0
            && self.surface != 0
            && self.seat != 0
        {
            self.inhibitor = self.ids.next();
            effects.push(Effect::Submit(Request::InhibitShortcuts {
                manager: self.inhibit_manager,
                new_id: self.inhibitor,
                surface: self.surface,
                seat: self.seat,
            }));
        }

        // After an acknowledged configure: make sure pool and buffer
        // exist, then render, attach, commit.  The phase advances only
        // when the session confirms the batch went out.
        if self.phase == ConfigurationPhase::SurfaceConfigureAcked {
            if self.pool == 0 {
                self.pool = self.ids.next();
                effects.push(Effect::SubmitWithPoolFd(Request::CreatePool {
                    shm: self.shm,
                    new_id: self.pool,
                    size: self.geometry.pool_size() as i32,
                }));
            }
            if self.buffer == 0 {
                self.buffer = self.ids.next();
                effects.push(Effect::Submit(Request::CreateBuffer {
                    pool: self.pool,
                    new_id: self.buffer,
                    width: self.geometry.width as i32,
                    height: self.geometry.height as i32,
                    stride: self.geometry.stride() as i32,
                    format: ops::FORMAT_XRGB8888,
                }));
            }
            effects.push(Effect::Render);
            effects.push(Effect::Submit(Request::Attach {
                surface: self.surface,
                buffer: self.buffer,
            }));
            effects.push(Effect::Submit(Request::Commit {
                surface: self.surface,
            }));
        }

        effects
    }

    /// Marks the attach+commit batch as delivered.  Called by the session
    /// after every effect of a [`poll_progress`] round succeeded, so the
    /// phase never claims `SurfaceAttached` for a batch that failed to
    /// send.
    ///
    /// [`poll_progress`]: ConnectionState::poll_progress
    pub fn confirm_surface_attached(&mut self) {
        if self.phase == ConfigurationPhase::SurfaceConfigureAcked
            && self.pool != 0
            && self.buffer != 0
        {
            self.phase = ConfigurationPhase::SurfaceAttached;
        }
    }

    fn on_global(&mut self, global: GlobalDescriptor) -> Vec<Effect> {
        let slot = match global.interface.as_str() {
            ops::IFACE_COMPOSITOR => &mut self.compositor,
            ops::IFACE_SHM => &mut self.shm,
            ops::IFACE_WM_BASE => &mut self.wm_base,
            ops::IFACE_SEAT => &mut self.seat,
            ops::IFACE_INHIBIT_MANAGER => &mut self.inhibit_manager,
            other => {
                // Forward compatible: unknown globals are ignored.
                debug!(interface = other, "ignoring unmatched global");
                return Vec::new();
            }
        };
        if *slot != 0 {
            debug!(interface = %global.interface, "interface already bound");
            return Vec::new();
        }
        let new_id = self.ids.next();
        *slot = new_id;
        if self.phase == ConfigurationPhase::Unconfigured {
            self.phase = ConfigurationPhase::InterfacesBinding;
        }
        vec![Effect::Submit(Request::Bind {
            registry: self.registry,
            numeric_name: global.numeric_name,
            interface: global.interface,
            version: global.version,
            new_id,
        })]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

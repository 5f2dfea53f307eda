//! Window system abstraction the visualizer drives.
//!
//! The visualizer never talks to winit directly: it asks a [`WindowSystem`]
//! for a window and a backend, then pumps [`InputEvent`]s out of it. The
//! winit implementation lives in [`crate::winit_window`], a scripted one
//! for tests and offscreen runs in [`crate::headless_window`].

use geoviz_core::Result;
use geoviz_gpu::SharedBackend;

/// Placement and initial state of a new window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub visible: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "geoviz".to_string(),
            width: 640,
            height: 480,
            left: 50,
            top: 50,
            visible: true,
        }
    }
}

/// Key identity after stripping modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Printable key, letters lowercased
    Character(char),
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
        alt: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        ctrl: false,
        shift: true,
        alt: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Input delivered to the visualizer, in window pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Framebuffer resized
    Resized { width: u32, height: u32 },
    CloseRequested,
    MouseButton {
        button: MouseButton,
        pressed: bool,
        modifiers: Modifiers,
    },
    CursorMoved { x: f64, y: f64 },
    /// Vertical scroll in lines, positive away from the user
    Scroll { delta: f32 },
    /// Key press; releases are not delivered
    Key { key: Key, modifiers: Modifiers },
    /// The window contents were damaged and need a redraw
    Refresh,
}

/// A native window owned by a visualizer
pub trait WindowHandle {
    /// Current framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    fn set_should_close(&mut self, value: bool);

    fn should_close(&self) -> bool;

    /// Make this window's surface the current render target
    fn make_context_current(&mut self) {}

    fn set_title(&mut self, title: &str);

    /// Identifier unique within the owning window system
    fn id(&self) -> u64;
}

/// Source of windows, backends and input events
pub trait WindowSystem {
    fn create_window(&mut self, config: &WindowConfig) -> Result<Box<dyn WindowHandle>>;

    /// Close a window created by this system and free its native resources
    fn destroy_window(&mut self, window: Box<dyn WindowHandle>);

    /// Build a graphics backend rendering into `window`
    fn create_backend(&mut self, window: &dyn WindowHandle) -> Result<SharedBackend>;

    /// Process pending events without blocking
    fn poll_events(&mut self, window: &mut dyn WindowHandle) -> Vec<InputEvent>;

    /// Block until at least one event arrives, then process it
    fn wait_events(&mut self, window: &mut dyn WindowHandle) -> Vec<InputEvent>;

    /// Callback receiving platform error descriptions
    fn set_error_callback(&mut self, callback: Box<dyn FnMut(&str)>);
}

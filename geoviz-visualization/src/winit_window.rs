//! Native windows through winit, pumped on demand by the visualizer

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

use geoviz_core::{Error, Result};
use geoviz_gpu::{share_backend, BackendConfig, SharedBackend, WgpuBackend};

use crate::window::{InputEvent, Key, Modifiers, MouseButton, WindowConfig, WindowHandle, WindowSystem};

/// Window created by [`WinitWindowSystem`]
pub struct WinitWindow {
    window: Arc<Window>,
    id: u64,
    should_close: bool,
}

impl WindowHandle for WinitWindow {
    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn set_should_close(&mut self, value: bool) {
        self.should_close = value;
    }

    fn should_close(&self) -> bool {
        self.should_close
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn id(&self) -> u64 {
        self.id
    }
}

/// Owns the process-wide winit event loop
pub struct WinitWindowSystem {
    event_loop: EventLoop<()>,
    windows: HashMap<u64, Arc<Window>>,
    modifiers: ModifiersState,
    backend_config: BackendConfig,
    error_callback: Option<Box<dyn FnMut(&str)>>,
}

impl WinitWindowSystem {
    /// Create the event loop; fails when no display is available
    pub fn new() -> Result<Self> {
        let event_loop =
            EventLoop::new().map_err(|e| Error::Initialization(format!("Failed to create event loop: {}", e)))?;
        Ok(Self {
            event_loop,
            windows: HashMap::new(),
            modifiers: ModifiersState::empty(),
            backend_config: BackendConfig::default(),
            error_callback: None,
        })
    }

    pub fn with_backend_config(mut self, config: BackendConfig) -> Self {
        self.backend_config = config;
        self
    }

    fn report_error(&mut self, message: &str) {
        if let Some(callback) = self.error_callback.as_mut() {
            callback(message);
        }
    }

    fn pump(&mut self, window: &mut dyn WindowHandle, timeout: Option<Duration>) -> Vec<InputEvent> {
        let target = window.id();
        let mut events = Vec::new();
        let modifiers = &mut self.modifiers;
        let status = self.event_loop.pump_events(timeout, |event, _| {
            if let Event::WindowEvent { window_id, event } = event {
                if u64::from(window_id) == target {
                    translate_event(event, modifiers, &mut events);
                }
            }
        });
        if let PumpStatus::Exit(code) = status {
            log::debug!("event loop exited with code {}", code);
            window.set_should_close(true);
        }
        events
    }
}

fn modifiers_of(state: &ModifiersState) -> Modifiers {
    Modifiers {
        ctrl: state.control_key(),
        shift: state.shift_key(),
        alt: state.alt_key(),
    }
}

fn translate_key(key: &WinitKey) -> Key {
    match key {
        WinitKey::Named(NamedKey::Escape) => Key::Escape,
        WinitKey::Character(text) => text
            .chars()
            .next()
            .map(|c| Key::Character(c.to_ascii_lowercase()))
            .unwrap_or(Key::Other),
        _ => Key::Other,
    }
}

fn translate_event(event: WindowEvent, modifiers: &mut ModifiersState, events: &mut Vec<InputEvent>) {
    match event {
        WindowEvent::Resized(size) => events.push(InputEvent::Resized {
            width: size.width,
            height: size.height,
        }),
        WindowEvent::CloseRequested => events.push(InputEvent::CloseRequested),
        WindowEvent::ModifiersChanged(new) => *modifiers = new.state(),
        WindowEvent::MouseInput { state, button, .. } => {
            let button = match button {
                winit::event::MouseButton::Left => MouseButton::Left,
                winit::event::MouseButton::Middle => MouseButton::Middle,
                winit::event::MouseButton::Right => MouseButton::Right,
                _ => return,
            };
            events.push(InputEvent::MouseButton {
                button,
                pressed: state == ElementState::Pressed,
                modifiers: modifiers_of(modifiers),
            });
        }
        WindowEvent::CursorMoved { position, .. } => events.push(InputEvent::CursorMoved {
            x: position.x,
            y: position.y,
        }),
        WindowEvent::MouseWheel { delta, .. } => {
            let delta = match delta {
                MouseScrollDelta::LineDelta(_, y) => y,
                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
            };
            events.push(InputEvent::Scroll { delta });
        }
        WindowEvent::KeyboardInput { event, .. } => {
            if event.state == ElementState::Pressed {
                events.push(InputEvent::Key {
                    key: translate_key(&event.logical_key),
                    modifiers: modifiers_of(modifiers),
                });
            }
        }
        WindowEvent::RedrawRequested => events.push(InputEvent::Refresh),
        _ => {}
    }
}

impl WindowSystem for WinitWindowSystem {
    fn create_window(&mut self, config: &WindowConfig) -> Result<Box<dyn WindowHandle>> {
        let built = WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_position(PhysicalPosition::new(config.left, config.top))
            .with_visible(config.visible)
            .build(&self.event_loop);
        let window = match built {
            Ok(window) => Arc::new(window),
            Err(e) => {
                let message = format!("Failed to create window: {}", e);
                self.report_error(&message);
                return Err(Error::Initialization(message));
            }
        };
        let id = u64::from(window.id());
        self.windows.insert(id, Arc::clone(&window));
        log::debug!("created window {} ({}x{})", id, config.width, config.height);
        Ok(Box::new(WinitWindow {
            window,
            id,
            should_close: false,
        }))
    }

    fn destroy_window(&mut self, window: Box<dyn WindowHandle>) {
        let id = window.id();
        // The native window closes once its last Arc is gone
        drop(window);
        if self.windows.remove(&id).is_some() {
            log::debug!("destroyed window {}", id);
        } else {
            log::warn!("destroy_window called for unknown window {}", id);
        }
    }

    fn create_backend(&mut self, window: &dyn WindowHandle) -> Result<SharedBackend> {
        let Some(native) = self.windows.get(&window.id()).cloned() else {
            return Err(Error::Initialization(format!("unknown window {}", window.id())));
        };
        let (width, height) = window.framebuffer_size();
        match pollster::block_on(WgpuBackend::new(native, width, height, self.backend_config.clone())) {
            Ok(backend) => Ok(share_backend(backend)),
            Err(e) => {
                let message = format!("Failed to create graphics backend: {}", e);
                self.report_error(&message);
                Err(Error::Initialization(message))
            }
        }
    }

    fn poll_events(&mut self, window: &mut dyn WindowHandle) -> Vec<InputEvent> {
        self.pump(window, Some(Duration::ZERO))
    }

    fn wait_events(&mut self, window: &mut dyn WindowHandle) -> Vec<InputEvent> {
        self.pump(window, None)
    }

    fn set_error_callback(&mut self, callback: Box<dyn FnMut(&str)>) {
        self.error_callback = Some(callback);
    }
}

//! Window-owning visualizer with a dirty-flag event loop.
//!
//! A [`Visualizer`] tracks a set of shared geometries, one renderer per
//! geometry, and redraws only when something marked the frame dirty. The
//! window system is passed in by the application so the same loop runs on
//! winit or on the scripted headless system.

use nalgebra::Matrix4;

use geoviz_core::{
    AxisAlignedBoundingBox, Error, Geometry, GeometryKind, Point3f, Result, SharedGeometry, TriangleMesh,
};
use geoviz_gpu::{GraphicsBackend, SharedBackend};

use crate::color_map::ColorMapOption;
use crate::geometry_renderer::GeometryRenderer;
use crate::render_option::{MeshColorOption, PointColorOption, RenderOption};
use crate::report::FrameReport;
use crate::view_control::ViewControl;
use crate::window::{InputEvent, Key, Modifiers, MouseButton, WindowConfig, WindowHandle, WindowSystem};

/// Per-iteration hook run by [`Visualizer::run`]; returns whether geometry changed
pub type AnimationCallback = Box<dyn FnMut(&mut Visualizer) -> bool>;

#[derive(Debug, Default)]
struct MouseState {
    left: bool,
    middle: bool,
    ctrl: bool,
    last_position: Option<(f64, f64)>,
}

pub struct Visualizer {
    window: Option<Box<dyn WindowHandle>>,
    backend: Option<SharedBackend>,
    view_control: ViewControl,
    render_option: RenderOption,
    renderers: Vec<GeometryRenderer>,
    geometries: Vec<SharedGeometry>,
    utility_renderers: Vec<GeometryRenderer>,
    coordinate_frame: Option<SharedGeometry>,
    animation_callback: Option<AnimationCallback>,
    callback_replaced: bool,
    is_initialized: bool,
    is_redraw_required: bool,
    mouse: MouseState,
}

fn with_backend<T>(backend: &SharedBackend, f: impl FnOnce(&mut dyn GraphicsBackend) -> Result<T>) -> Result<T> {
    let mut backend = backend
        .try_borrow_mut()
        .map_err(|_| Error::Gpu("graphics backend is already in use".to_string()))?;
    f(&mut *backend)
}

fn initialization(error: Error) -> Error {
    match error {
        Error::Initialization(_) => error,
        other => Error::Initialization(other.to_string()),
    }
}

/// Size and origin of the axis gizmo for the scene bounds
fn frame_placement(bounds: &AxisAlignedBoundingBox) -> (f32, Point3f) {
    let extent = bounds.max_extent();
    if bounds.is_empty() || extent <= 0.0 {
        (1.0, Point3f::origin())
    } else {
        (0.2 * extent, bounds.min_bound)
    }
}

fn first_error(results: impl IntoIterator<Item = Result<()>>) -> Result<()> {
    let mut first = None;
    for result in results {
        if let Err(e) = result {
            first.get_or_insert(e);
        }
    }
    first.map_or(Ok(()), Err)
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            window: None,
            backend: None,
            view_control: ViewControl::new(),
            render_option: RenderOption::default(),
            renderers: Vec::new(),
            geometries: Vec::new(),
            utility_renderers: Vec::new(),
            coordinate_frame: None,
            animation_callback: None,
            callback_replaced: false,
            is_initialized: false,
            is_redraw_required: false,
            mouse: MouseState::default(),
        }
    }

    /// Open a window and its graphics backend.
    ///
    /// Any failure leaves the visualizer uninitialized and is reported as
    /// [`Error::Initialization`].
    pub fn create_window(&mut self, windowing: &mut dyn WindowSystem, config: &WindowConfig) -> Result<()> {
        if self.is_initialized {
            log::warn!("Visualizer already has a window, replacing it");
            self.destroy_window(windowing);
        }
        windowing.set_error_callback(Box::new(|message: &str| log::warn!("Window system error: {}", message)));

        let mut window = windowing.create_window(config).map_err(initialization)?;
        let backend = windowing.create_backend(window.as_ref()).map_err(initialization)?;
        window.make_context_current();

        self.view_control = ViewControl::new();
        self.render_option = RenderOption::default();
        self.mouse = MouseState::default();

        let (width, height) = window.framebuffer_size();
        with_backend(&backend, |backend| {
            backend.resize(width, height);
            Ok(())
        })
        .map_err(initialization)?;
        self.view_control.change_window_size(width, height);
        window.set_title(&config.title);

        self.window = Some(window);
        self.backend = Some(backend);
        self.is_initialized = true;
        self.reset_view_point(false);
        log::info!("Created window \"{}\" ({}x{})", config.title, width, height);
        Ok(())
    }

    /// Release every renderer and the backend, then hand the window back to `windowing`
    pub fn destroy_window(&mut self, windowing: &mut dyn WindowSystem) {
        self.is_initialized = false;
        self.renderers.clear();
        self.geometries.clear();
        self.utility_renderers.clear();
        self.coordinate_frame = None;
        self.backend = None;
        if let Some(window) = self.window.take() {
            windowing.destroy_window(window);
        }
        self.is_redraw_required = false;
        log::debug!("Window destroyed");
    }

    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    fn require_backend(&self) -> Result<SharedBackend> {
        match (&self.backend, self.is_initialized) {
            (Some(backend), true) => Ok(backend.clone()),
            _ => Err(Error::NotInitialized),
        }
    }

    /// Start tracking `geometry` and build its renderer.
    ///
    /// With `reset_bounding_box`, the camera is refit to include it and
    /// reset. Nothing is tracked if the renderer rejects the geometry.
    pub fn add_geometry(&mut self, geometry: SharedGeometry, reset_bounding_box: bool) -> Result<()> {
        let backend = self.require_backend()?;
        let kind = geometry.kind();
        if kind == GeometryKind::Unspecified {
            return Err(Error::UnsupportedGeometryKind {
                expected: None,
                found: kind,
            });
        }
        if self.contains_geometry(&geometry) {
            return Err(Error::InvalidData("geometry is already tracked".to_string()));
        }

        let mut renderer = GeometryRenderer::for_kind(kind, &backend)?;
        renderer.add_geometry(geometry.clone())?;
        self.renderers.push(renderer);
        self.geometries.push(geometry.clone());

        if reset_bounding_box {
            self.view_control.fit_in_geometry(&geometry.bounding_box());
            self.reset_view_point(false);
        }
        log::debug!(
            "Add geometry and update bounding box to {}",
            self.view_control.bounding_box()
        );
        self.update_geometry(None)
    }

    /// Stop tracking `geometry`, releasing its renderer
    pub fn remove_geometry(&mut self, geometry: &SharedGeometry, reset_bounding_box: bool) -> Result<()> {
        self.require_backend()?;
        let index = self
            .renderers
            .iter()
            .position(|renderer| renderer.has_geometry(geometry))
            .ok_or(Error::NotFound)?;
        self.renderers.remove(index);
        self.geometries.retain(|tracked| !tracked.ptr_eq(geometry));

        if reset_bounding_box {
            self.reset_view_point(true);
        }
        log::debug!(
            "Remove geometry and update bounding box to {}",
            self.view_control.bounding_box()
        );
        self.update_geometry(None)
    }

    pub fn clear_geometries(&mut self) -> Result<()> {
        self.require_backend()?;
        self.renderers.clear();
        self.geometries.clear();
        self.update_geometry(None)
    }

    /// Whether any geometry is tracked
    pub fn has_geometry(&self) -> bool {
        !self.geometries.is_empty()
    }

    pub fn contains_geometry(&self, geometry: &SharedGeometry) -> bool {
        self.geometries.iter().any(|tracked| tracked.ptr_eq(geometry))
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn geometries(&self) -> &[SharedGeometry] {
        &self.geometries
    }

    pub fn renderers(&self) -> &[GeometryRenderer] {
        &self.renderers
    }

    /// Mark bound data stale for every renderer, or only those drawing
    /// `geometry`. The frame is marked dirty either way.
    pub fn update_geometry(&mut self, geometry: Option<&SharedGeometry>) -> Result<()> {
        let results: Vec<Result<()>> = self
            .renderers
            .iter_mut()
            .filter(|renderer| geometry.map_or(true, |g| renderer.has_geometry(g)))
            .map(GeometryRenderer::update_geometry)
            .collect();
        self.update_render();
        first_error(results)
    }

    /// Request a redraw before the next event wait
    pub fn update_render(&mut self) {
        self.is_redraw_required = true;
    }

    pub fn is_redraw_required(&self) -> bool {
        self.is_redraw_required
    }

    /// Reset the camera, first refitting it to every tracked geometry when
    /// `reset_bounding_box` is set
    pub fn reset_view_point(&mut self, reset_bounding_box: bool) {
        if reset_bounding_box {
            self.view_control.reset_bounding_box();
            for geometry in &self.geometries {
                self.view_control.fit_in_geometry(&geometry.bounding_box());
            }
            if let Some(frame) = &self.coordinate_frame {
                let (size, origin) = frame_placement(self.view_control.bounding_box());
                *frame.borrow_mut() =
                    Geometry::CoordinateFrameMesh(TriangleMesh::create_coordinate_frame(size, origin));
                let results: Vec<Result<()>> = self
                    .utility_renderers
                    .iter_mut()
                    .map(GeometryRenderer::update_geometry)
                    .collect();
                if let Err(e) = first_error(results) {
                    log::warn!("Failed to update coordinate frame: {}", e);
                }
            }
        }
        self.view_control.reset();
        self.update_render();
    }

    /// Set or clear the per-iteration hook; takes effect from the next iteration
    pub fn register_animation_callback(&mut self, callback: Option<AnimationCallback>) {
        self.animation_callback = callback;
        self.callback_replaced = true;
    }

    fn build_utilities(&mut self) -> Result<()> {
        if self.coordinate_frame.is_some() {
            return Ok(());
        }
        let backend = self.require_backend()?;
        let (size, origin) = frame_placement(self.view_control.bounding_box());
        let frame = SharedGeometry::new(Geometry::CoordinateFrameMesh(TriangleMesh::create_coordinate_frame(
            size, origin,
        )));
        let mut renderer = GeometryRenderer::for_kind(GeometryKind::CoordinateFrameMesh, &backend)?;
        renderer.add_geometry(frame.clone())?;
        self.utility_renderers.push(renderer);
        self.coordinate_frame = Some(frame);
        Ok(())
    }

    /// Run the event loop until the window closes.
    ///
    /// Events are polled while an animation callback is registered and
    /// waited for otherwise. The frame is marked dirty after every callback
    /// invocation, whatever it returned.
    pub fn run(&mut self, windowing: &mut dyn WindowSystem) -> Result<()> {
        self.require_backend()?;
        if let Err(e) = self.build_utilities() {
            log::warn!("Failed to build coordinate frame: {}", e);
        }
        loop {
            let open = if self.animation_callback.is_some() {
                self.poll_events(windowing)
            } else {
                self.wait_events(windowing)
            };
            if !open {
                break;
            }
            if let Some(mut callback) = self.animation_callback.take() {
                self.callback_replaced = false;
                let changed = callback(self);
                if !self.callback_replaced {
                    self.animation_callback = Some(callback);
                }
                if changed {
                    if let Err(e) = self.update_geometry(None) {
                        log::warn!("Failed to update geometry after animation callback: {}", e);
                    }
                }
                self.update_render();
            }
        }
        log::debug!("Event loop finished");
        Ok(())
    }

    /// One non-blocking loop step; returns whether the window is still open
    pub fn poll_events(&mut self, windowing: &mut dyn WindowSystem) -> bool {
        self.step(windowing, false)
    }

    /// One blocking loop step; returns whether the window is still open
    pub fn wait_events(&mut self, windowing: &mut dyn WindowSystem) -> bool {
        self.step(windowing, true)
    }

    fn step(&mut self, windowing: &mut dyn WindowSystem, block: bool) -> bool {
        if !self.is_initialized {
            return false;
        }
        match self.window.as_mut() {
            Some(window) if !window.should_close() => window.make_context_current(),
            _ => return false,
        }
        if self.is_redraw_required {
            let frame = self.render();
            if let Some(e) = &frame.frame_error {
                log::warn!("Frame failed: {}", e);
            }
        }

        let events = match self.window.as_mut() {
            Some(window) if block => windowing.wait_events(window.as_mut()),
            Some(window) => windowing.poll_events(window.as_mut()),
            None => return false,
        };
        for event in events {
            self.handle_event(event);
        }
        self.window.as_ref().is_some_and(|window| !window.should_close())
    }

    /// Draw every scene renderer, then the utility renderers, and present.
    ///
    /// Clears the dirty flag once the frame is presented; a failed frame
    /// leaves it set. Unit failures are collected in the report and do not
    /// stop other units.
    pub fn render(&mut self) -> FrameReport {
        let mut frame = FrameReport::default();
        let Ok(backend) = self.require_backend() else {
            frame.frame_error = Some(Error::NotInitialized);
            return frame;
        };
        self.view_control.set_view_matrices(Matrix4::identity());

        let clear_color = self.render_option.background_color;
        if let Err(e) = with_backend(&backend, |backend| backend.begin_frame(clear_color)) {
            frame.frame_error = Some(e);
            return frame;
        }
        for renderer in self.renderers.iter_mut().chain(self.utility_renderers.iter_mut()) {
            frame.units.extend(renderer.render(&self.render_option, &self.view_control));
        }
        match with_backend(&backend, |backend| backend.end_frame()) {
            Ok(()) => self.is_redraw_required = false,
            Err(e) => frame.frame_error = Some(e),
        }
        frame
    }

    /// Ask the loop to stop at the top of its next iteration
    pub fn close(&mut self) {
        if let Some(window) = self.window.as_mut() {
            window.set_should_close(true);
            log::debug!("[Visualizer] Window closing.");
        }
    }

    pub fn window(&self) -> Option<&dyn WindowHandle> {
        self.window.as_deref()
    }

    pub fn backend(&self) -> Option<&SharedBackend> {
        self.backend.as_ref()
    }

    pub fn view_control(&self) -> &ViewControl {
        &self.view_control
    }

    pub fn view_control_mut(&mut self) -> &mut ViewControl {
        &mut self.view_control
    }

    pub fn render_option(&self) -> &RenderOption {
        &self.render_option
    }

    /// Changes that affect vertex data need a following [`Visualizer::update_geometry`]
    pub fn render_option_mut(&mut self) -> &mut RenderOption {
        &mut self.render_option
    }

    /// The axis gizmo, built on the first [`Visualizer::run`]
    pub fn coordinate_frame(&self) -> Option<&SharedGeometry> {
        self.coordinate_frame.as_ref()
    }

    /// Log the mouse and keyboard bindings
    pub fn print_help(&self) {
        log::info!("  -- Mouse view control --");
        log::info!("    Left button + drag         : Rotate.");
        log::info!("    Ctrl + left button + drag  : Translate.");
        log::info!("    Wheel button + drag        : Translate.");
        log::info!("    Wheel                      : Zoom in/out.");
        log::info!("  -- Keyboard view control --");
        log::info!("    [/]          : Decrease/increase field of view.");
        log::info!("    R            : Reset view point.");
        log::info!("  -- General control --");
        log::info!("    Q, Esc       : Exit window.");
        log::info!("    H            : Print help message.");
        log::info!("  -- Render mode control --");
        log::info!("    L            : Turn on/off lighting.");
        log::info!("    +/-          : Increase/decrease point size.");
        log::info!("    Ctrl + +/-   : Increase/decrease line width.");
        log::info!("    N            : Turn on/off point cloud normal rendering.");
        log::info!("    S            : Toggle between mesh flat shading and smooth shading.");
        log::info!("    W            : Turn on/off mesh wireframe.");
        log::info!("    I            : Turn on/off image zoom in interpolation.");
        log::info!("    T            : Toggle among image render: no stretch / keep ratio / freely stretch.");
        log::info!("    F            : Turn on/off coordinate frame.");
        log::info!("  -- Color control --");
        log::info!("    0..4,9       : Set point cloud color option.");
        log::info!("    Ctrl + 0..4,9: Set mesh color option.");
        log::info!("    Shift + 0..4 : Set color map.");
    }

    fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Resized { width, height } => {
                if let Some(backend) = &self.backend {
                    let resized = with_backend(backend, |backend| {
                        backend.resize(width, height);
                        Ok(())
                    });
                    if let Err(e) = resized {
                        log::warn!("Failed to resize surface: {}", e);
                    }
                }
                self.view_control.change_window_size(width, height);
                self.update_render();
            }
            InputEvent::CloseRequested => self.close(),
            InputEvent::MouseButton {
                button,
                pressed,
                modifiers,
            } => match button {
                MouseButton::Left => {
                    self.mouse.left = pressed;
                    self.mouse.ctrl = modifiers.ctrl;
                }
                MouseButton::Middle => self.mouse.middle = pressed,
                MouseButton::Right => {}
            },
            InputEvent::CursorMoved { x, y } => {
                if let Some((last_x, last_y)) = self.mouse.last_position {
                    let (dx, dy) = ((x - last_x) as f32, (y - last_y) as f32);
                    if self.mouse.left && !self.mouse.ctrl {
                        self.view_control.rotate(dx, dy);
                        self.update_render();
                    } else if self.mouse.left || self.mouse.middle {
                        self.view_control.translate(dx, dy);
                        self.update_render();
                    }
                }
                self.mouse.last_position = Some((x, y));
            }
            InputEvent::Scroll { delta } => {
                self.view_control.scale(delta);
                self.update_render();
            }
            InputEvent::Key { key, modifiers } => self.handle_key(key, modifiers),
            InputEvent::Refresh => self.update_render(),
        }
    }

    fn refresh_geometry(&mut self) {
        if let Err(e) = self.update_geometry(None) {
            log::warn!("Failed to update geometry: {}", e);
        }
    }

    fn handle_key(&mut self, key: Key, modifiers: Modifiers) {
        let option = &mut self.render_option;
        match key {
            Key::Escape | Key::Character('q') => self.close(),
            Key::Character('h') => self.print_help(),
            Key::Character('r') => self.reset_view_point(false),
            Key::Character(c @ ('+' | '=' | '-')) => {
                let steps = if c == '-' { -1.0 } else { 1.0 };
                if modifiers.ctrl {
                    option.change_line_width(steps);
                } else {
                    option.change_point_size(steps);
                    if option.point_show_normal {
                        self.refresh_geometry();
                    }
                }
            }
            Key::Character('n') => {
                option.toggle_point_show_normal();
                if option.point_show_normal {
                    self.refresh_geometry();
                }
            }
            Key::Character('s') => {
                option.toggle_shading_option();
                self.refresh_geometry();
            }
            Key::Character('w') => option.toggle_mesh_show_wireframe(),
            Key::Character('l') => option.toggle_light_on(),
            Key::Character('i') => option.toggle_interpolation_option(),
            Key::Character('t') => option.toggle_image_stretch_option(),
            Key::Character('f') => option.toggle_show_coordinate_frame(),
            Key::Character('[') => self.view_control.change_field_of_view(-1.0),
            Key::Character(']') => self.view_control.change_field_of_view(1.0),
            Key::Character(c) if c.is_ascii_digit() => {
                let digit = c.to_digit(10).unwrap_or_default();
                let changed = if modifiers.ctrl {
                    MeshColorOption::from_digit(digit).map(|mesh| option.mesh_color_option = mesh)
                } else if modifiers.shift {
                    ColorMapOption::from_digit(digit).map(|map| option.color_map = map)
                } else {
                    PointColorOption::from_digit(digit).map(|point| option.point_color_option = point)
                };
                if changed.is_some() {
                    self.refresh_geometry();
                }
            }
            _ => {}
        }
        self.update_render();
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

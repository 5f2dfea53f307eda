//! Visualization and rendering for 3D data
//!
//! This crate draws point clouds, triangle meshes and images with wgpu in a
//! winit window:
//! - Render units wrapping one GPU program each ([`shader`])
//! - Per-geometry renderers selecting units from the render options
//! - A [`Visualizer`] with a dirty-flag event loop and mouse/keyboard view control
//! - A headless window system for running without a display

pub mod color_map;
pub mod geometry_renderer;
pub mod gl_helper;
pub mod headless_window;
pub mod logging;
pub mod render_option;
pub mod report;
pub mod shader;
pub mod view_control;
pub mod visualizer;
pub mod window;
pub mod winit_window;

pub use color_map::ColorMapOption;
pub use geometry_renderer::GeometryRenderer;
pub use headless_window::{HeadlessWindow, HeadlessWindowSystem};
pub use logging::{init_logging, LoggingConfig};
pub use render_option::*;
pub use report::{FrameReport, RenderReport, UnitOutcome};
pub use view_control::{ProjectionType, ViewControl};
pub use visualizer::{AnimationCallback, Visualizer};
pub use window::{InputEvent, Key, Modifiers, MouseButton, WindowConfig, WindowHandle, WindowSystem};
pub use winit_window::WinitWindowSystem;

use geoviz_core::{Result, SharedGeometry};

/// Show `geometries` in a new window and block until it is closed
pub fn draw_geometries(geometries: &[SharedGeometry], config: &WindowConfig) -> Result<()> {
    let mut windowing = WinitWindowSystem::new()?;
    let mut visualizer = Visualizer::new();
    visualizer.create_window(&mut windowing, config)?;
    for geometry in geometries {
        visualizer.add_geometry(geometry.clone(), true)?;
    }
    visualizer.run(&mut windowing)?;
    visualizer.destroy_window(&mut windowing);
    Ok(())
}

/// Like [`draw_geometries`], calling `callback` once per loop iteration
pub fn draw_geometries_with_animation_callback(
    geometries: &[SharedGeometry],
    config: &WindowConfig,
    callback: AnimationCallback,
) -> Result<()> {
    let mut windowing = WinitWindowSystem::new()?;
    let mut visualizer = Visualizer::new();
    visualizer.create_window(&mut windowing, config)?;
    for geometry in geometries {
        visualizer.add_geometry(geometry.clone(), true)?;
    }
    visualizer.register_animation_callback(Some(callback));
    visualizer.run(&mut windowing)?;
    visualizer.destroy_window(&mut windowing);
    Ok(())
}

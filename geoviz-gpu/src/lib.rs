//! # geoviz GPU
//!
//! Graphics backends for the geoviz renderers.
//!
//! [`GraphicsBackend`] is the handle-based interface the render units talk
//! to. [`WgpuBackend`] implements it over a window surface with wgpu, and
//! [`HeadlessBackend`] records every call without touching a GPU.

pub mod backend;
pub mod device;
pub mod headless;
pub mod shaders;
pub mod vertex;
pub mod wgpu_backend;

pub use backend::*;
pub use device::GpuContext;
pub use headless::{HeadlessBackend, HeadlessLog, HeadlessRecorder, RecordedDraw};
pub use vertex::*;
pub use wgpu_backend::{BackendConfig, WgpuBackend};

//! GPU lifecycle of a single render unit

use std::cell::RefMut;
use std::fmt;

use geoviz_core::{Error, Geometry, Result};
use geoviz_gpu::{BufferId, DrawCall, FilterMode, GraphicsBackend, ProgramId, SharedBackend, TextureId};

use super::Technique;
use crate::render_option::{RenderOption, TextureInterpolationOption};
use crate::view_control::ViewControl;

/// Observable lifecycle state of a [`ShaderWrapper`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Program built, data needs (re)binding
    Compiled,
    /// Data uploaded for the current geometry snapshot
    Bound,
    /// Drawn at least once since the last bind
    Rendered,
    CompileFailed,
    Released,
}

enum Program {
    Compiled(ProgramId),
    Failed(String),
    Released,
}

struct BoundData {
    vertex_buffer: BufferId,
    vertex_count: u32,
    texture: Option<TextureId>,
}

/// A compiled program plus the buffers it draws from.
///
/// The program is built on construction. Data is bound lazily on the first
/// render after construction or [`ShaderWrapper::invalidate`], and every
/// handle goes back to the backend exactly once, on [`ShaderWrapper::release`]
/// or drop.
pub struct ShaderWrapper {
    technique: Technique,
    backend: SharedBackend,
    program: Program,
    bound: Option<BoundData>,
    needs_bind: bool,
    rendered: bool,
}

fn borrow_backend(backend: &SharedBackend) -> Result<RefMut<'_, dyn GraphicsBackend + 'static>> {
    backend
        .try_borrow_mut()
        .map_err(|_| Error::Gpu("graphics backend is already in use".to_string()))
}

impl ShaderWrapper {
    pub fn new(technique: Technique, backend: SharedBackend) -> Self {
        let program = match borrow_backend(&backend)
            .and_then(|mut backend| backend.create_program(&technique.descriptor()))
        {
            Ok(id) => Program::Compiled(id),
            Err(e) => {
                log::warn!("{}: compile failed: {}", technique.label(), e);
                Program::Failed(e.to_string())
            }
        };
        Self {
            technique,
            backend,
            program,
            bound: None,
            needs_bind: true,
            rendered: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.technique.label()
    }

    pub fn technique(&self) -> Technique {
        self.technique
    }

    pub fn state(&self) -> UnitState {
        match self.program {
            Program::Released => UnitState::Released,
            Program::Failed(_) => UnitState::CompileFailed,
            Program::Compiled(_) if self.bound.is_none() || self.needs_bind => UnitState::Compiled,
            Program::Compiled(_) if self.rendered => UnitState::Rendered,
            Program::Compiled(_) => UnitState::Bound,
        }
    }

    pub fn compile_error(&self) -> Option<&str> {
        match &self.program {
            Program::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    fn program_id(&self) -> Result<ProgramId> {
        match &self.program {
            Program::Compiled(id) => Ok(*id),
            Program::Failed(reason) => Err(Error::Compile {
                unit: self.name().to_string(),
                reason: reason.clone(),
            }),
            Program::Released => Err(Error::Gpu(format!("{} was released", self.name()))),
        }
    }

    /// Upload `geometry` for drawing; a no-op while the bound data is current
    pub fn bind(&mut self, geometry: &Geometry, option: &RenderOption, view: &ViewControl) -> Result<()> {
        self.program_id()?;
        if self.bound.is_some() && !self.needs_bind {
            return Ok(());
        }
        let prepared = self.technique.prepare(geometry, option, view)?;
        self.unbind();

        let bound = {
            let mut backend = borrow_backend(&self.backend)?;
            let vertex_buffer = backend.create_vertex_buffer(self.technique.label(), prepared.vertices.as_bytes())?;
            let texture = match &prepared.texture {
                Some(pixels) => {
                    match backend.create_texture(self.technique.label(), pixels.width, pixels.height, &pixels.rgba) {
                        Ok(id) => Some(id),
                        Err(e) => {
                            backend.destroy_buffer(vertex_buffer);
                            return Err(e);
                        }
                    }
                }
                None => None,
            };
            BoundData {
                vertex_buffer,
                vertex_count: prepared.vertices.len() as u32,
                texture,
            }
        };
        self.bound = Some(bound);
        self.needs_bind = false;
        self.rendered = false;
        Ok(())
    }

    /// Draw `geometry`, binding it first when needed
    pub fn render(&mut self, geometry: &Geometry, option: &RenderOption, view: &ViewControl) -> Result<()> {
        let program = self.program_id()?;
        self.bind(geometry, option, view)?;
        let Some(bound) = &self.bound else {
            return Err(Error::Gpu(format!("{} has no bound data", self.name())));
        };

        let uniforms = self.technique.uniforms(geometry, option, view);
        let filter = match option.interpolation_option {
            TextureInterpolationOption::Linear => FilterMode::Linear,
            TextureInterpolationOption::Nearest => FilterMode::Nearest,
        };
        borrow_backend(&self.backend)?.draw(&DrawCall {
            program,
            vertex_buffer: bound.vertex_buffer,
            element_count: bound.vertex_count,
            uniforms: &uniforms,
            texture: bound.texture,
            filter,
        })?;
        self.rendered = true;
        Ok(())
    }

    /// Mark the bound data stale; the program stays compiled
    pub fn invalidate(&mut self) -> Result<()> {
        if let Program::Released = self.program {
            return Err(Error::Gpu(format!("{} was released", self.name())));
        }
        self.needs_bind = true;
        self.rendered = false;
        Ok(())
    }

    /// Free every GPU handle; later calls do nothing
    pub fn release(&mut self) {
        if let Program::Released = self.program {
            return;
        }
        self.unbind();
        if let Program::Compiled(id) = self.program {
            match borrow_backend(&self.backend) {
                Ok(mut backend) => backend.destroy_program(id),
                Err(e) => log::warn!("{}: leaking {}: {}", self.name(), id, e),
            }
        }
        self.program = Program::Released;
        log::debug!("{} released", self.name());
    }

    fn unbind(&mut self) {
        let Some(bound) = self.bound.take() else {
            return;
        };
        match borrow_backend(&self.backend) {
            Ok(mut backend) => {
                backend.destroy_buffer(bound.vertex_buffer);
                if let Some(texture) = bound.texture {
                    backend.destroy_texture(texture);
                }
            }
            Err(e) => log::warn!("{}: leaking bound buffers: {}", self.technique.label(), e),
        }
    }
}

impl Drop for ShaderWrapper {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ShaderWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderWrapper")
            .field("technique", &self.technique)
            .field("state", &self.state())
            .finish()
    }
}

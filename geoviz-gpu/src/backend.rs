//! Backend-agnostic graphics interface used by the render units

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use geoviz_core::Result;

use crate::vertex::ShaderUniforms;

/// Handle of a compiled program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u64);

/// Handle of a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Handle of an RGBA8 texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Vertex format a program consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexLayout {
    /// [`crate::ColorVertex`]
    Color,
    /// [`crate::LitVertex`]
    Lit,
    /// [`crate::TexturedVertex`]
    Textured,
}

/// How a program assembles its vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// One screen-aligned quad per vertex, sized by the point size uniform
    Points,
    /// Two vertices per segment
    Lines,
    /// Three vertices per triangle, no index buffer
    Triangles,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

/// Everything a backend needs to build one program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramDescriptor {
    pub label: &'static str,
    /// WGSL source with `vs_main` and `fs_main` entry points
    pub source: &'static str,
    pub layout: VertexLayout,
    pub primitive: Primitive,
    /// Whether the program samples a texture at group 1
    pub textured: bool,
    /// Whether the program draws in normalized device coordinates on top of the scene
    pub overlay: bool,
}

/// One draw request inside a frame
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub program: ProgramId,
    pub vertex_buffer: BufferId,
    /// Number of vertices (points for [`Primitive::Points`])
    pub element_count: u32,
    pub uniforms: &'a ShaderUniforms,
    pub texture: Option<TextureId>,
    pub filter: FilterMode,
}

/// GPU resource and frame interface.
///
/// Handles are never reused: every create call returns a fresh id, and a
/// destroyed handle stays invalid. Destroying an unknown handle is a no-op.
pub trait GraphicsBackend {
    /// Builds a program; fails if the shader does not compile or link
    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramId>;

    fn destroy_program(&mut self, id: ProgramId);

    fn create_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> Result<BufferId>;

    fn destroy_buffer(&mut self, id: BufferId);

    /// Uploads a `width * height` RGBA8 texture
    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<TextureId>;

    fn destroy_texture(&mut self, id: TextureId);

    /// Starts a frame cleared to `clear_color`
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<()>;

    /// Queues a draw into the current frame
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()>;

    /// Submits the queued draws and presents
    fn end_frame(&mut self) -> Result<()>;

    /// Reconfigures the render target after a framebuffer resize
    fn resize(&mut self, width: u32, height: u32);

    fn surface_size(&self) -> (u32, u32);
}

/// Backend shared by every render unit of a visualizer.
///
/// Rendering is single threaded; each unit borrows the backend only for the
/// duration of one GPU call sequence.
pub type SharedBackend = Rc<RefCell<dyn GraphicsBackend>>;

/// Wrap a backend for sharing between render units
pub fn share_backend<B: GraphicsBackend + 'static>(backend: B) -> SharedBackend {
    Rc::new(RefCell::new(backend))
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

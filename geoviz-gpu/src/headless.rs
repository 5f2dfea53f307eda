//! A backend that draws nothing and records everything.
//!
//! Used for offscreen runs without a display and as the observable backend
//! in tests: every call is counted, live handles are tracked, and programs
//! can be made to fail compilation by label.

use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use geoviz_core::{Error, Result};

use crate::backend::*;

/// A draw as the headless backend saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub program: &'static str,
    pub element_count: u32,
    pub textured: bool,
    pub filter: FilterMode,
}

/// Everything the headless backend observed
#[derive(Debug, Default)]
pub struct HeadlessLog {
    /// Total number of backend calls of any kind
    pub calls: usize,
    pub programs_created: usize,
    pub buffers_created: usize,
    pub textures_created: usize,
    pub live_programs: HashMap<ProgramId, &'static str>,
    pub live_buffers: HashSet<BufferId>,
    pub live_textures: HashSet<TextureId>,
    /// Destroy calls naming a handle that was not live
    pub invalid_destroys: usize,
    /// Draws of the frame in progress, moved to `frames` on `end_frame`
    pub pending: Vec<RecordedDraw>,
    pub frames: Vec<Vec<RecordedDraw>>,
    pub resizes: Vec<(u32, u32)>,
}

impl HeadlessLog {
    pub fn live_handle_count(&self) -> usize {
        self.live_programs.len() + self.live_buffers.len() + self.live_textures.len()
    }

    /// Program labels drawn in the last completed frame, in order
    pub fn last_frame_programs(&self) -> Vec<&'static str> {
        self.frames
            .last()
            .map(|frame| frame.iter().map(|draw| draw.program).collect())
            .unwrap_or_default()
    }

    /// Program labels of every draw so far, completed frames first
    pub fn drawn_programs(&self) -> Vec<&'static str> {
        self.frames
            .iter()
            .flatten()
            .chain(&self.pending)
            .map(|draw| draw.program)
            .collect()
    }
}

/// Read handle onto a [`HeadlessBackend`]'s log that outlives moving the
/// backend into a [`SharedBackend`]
#[derive(Debug, Clone)]
pub struct HeadlessRecorder(Rc<RefCell<HeadlessLog>>);

impl HeadlessRecorder {
    pub fn log(&self) -> Ref<'_, HeadlessLog> {
        self.0.borrow()
    }

    pub fn calls(&self) -> usize {
        self.0.borrow().calls
    }

    pub fn frame_count(&self) -> usize {
        self.0.borrow().frames.len()
    }
}

/// Recording backend with a fixed-size virtual surface
#[derive(Debug)]
pub struct HeadlessBackend {
    log: Rc<RefCell<HeadlessLog>>,
    failing_programs: HashSet<&'static str>,
    textured_programs: HashSet<ProgramId>,
    failing_frames: usize,
    size: (u32, u32),
    in_frame: bool,
    next_id: u64,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            log: Rc::new(RefCell::new(HeadlessLog::default())),
            failing_programs: HashSet::new(),
            textured_programs: HashSet::new(),
            failing_frames: 0,
            size: (width, height),
            in_frame: false,
            next_id: 1,
        }
    }

    /// Make `create_program` fail for programs with this label
    pub fn with_failing_program(mut self, label: &'static str) -> Self {
        self.failing_programs.insert(label);
        self
    }

    /// Make the next `count` calls to `begin_frame` fail as if the surface were lost
    pub fn with_failing_frames(mut self, count: usize) -> Self {
        self.failing_frames = count;
        self
    }

    pub fn recorder(&self) -> HeadlessRecorder {
        HeadlessRecorder(Rc::clone(&self.log))
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record_call(&self) {
        self.log.borrow_mut().calls += 1;
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramId> {
        self.record_call();
        if self.failing_programs.contains(descriptor.label) {
            return Err(Error::Gpu(format!("shader {} failed validation", descriptor.label)));
        }
        let id = ProgramId(self.next_id());
        if descriptor.textured {
            self.textured_programs.insert(id);
        }
        let mut log = self.log.borrow_mut();
        log.programs_created += 1;
        log.live_programs.insert(id, descriptor.label);
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) {
        self.record_call();
        self.textured_programs.remove(&id);
        let mut log = self.log.borrow_mut();
        if log.live_programs.remove(&id).is_none() {
            log.invalid_destroys += 1;
        }
    }

    fn create_vertex_buffer(&mut self, _label: &str, _contents: &[u8]) -> Result<BufferId> {
        self.record_call();
        let id = BufferId(self.next_id());
        let mut log = self.log.borrow_mut();
        log.buffers_created += 1;
        log.live_buffers.insert(id);
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.record_call();
        let mut log = self.log.borrow_mut();
        if !log.live_buffers.remove(&id) {
            log.invalid_destroys += 1;
        }
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<TextureId> {
        self.record_call();
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(Error::InvalidData(format!(
                "texture {label} has {} bytes for {width}x{height}",
                rgba.len()
            )));
        }
        let id = TextureId(self.next_id());
        let mut log = self.log.borrow_mut();
        log.textures_created += 1;
        log.live_textures.insert(id);
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.record_call();
        let mut log = self.log.borrow_mut();
        if !log.live_textures.remove(&id) {
            log.invalid_destroys += 1;
        }
    }

    fn begin_frame(&mut self, _clear_color: [f32; 4]) -> Result<()> {
        self.record_call();
        if self.in_frame {
            return Err(Error::Gpu("frame already in progress".to_string()));
        }
        if self.failing_frames > 0 {
            self.failing_frames -= 1;
            return Err(Error::Gpu("surface unavailable".to_string()));
        }
        self.in_frame = true;
        self.log.borrow_mut().pending.clear();
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        self.record_call();
        if !self.in_frame {
            return Err(Error::Gpu("draw outside of a frame".to_string()));
        }
        let mut log = self.log.borrow_mut();
        let program = *log
            .live_programs
            .get(&call.program)
            .ok_or_else(|| Error::Gpu(format!("unknown {}", call.program)))?;
        if !log.live_buffers.contains(&call.vertex_buffer) {
            return Err(Error::Gpu(format!("unknown buffer {:?}", call.vertex_buffer)));
        }
        let textured = self.textured_programs.contains(&call.program);
        match call.texture {
            Some(texture) if !log.live_textures.contains(&texture) => {
                return Err(Error::Gpu(format!("unknown texture {texture:?}")));
            }
            None if textured => {
                return Err(Error::Gpu(format!("{program} needs a texture")));
            }
            _ => {}
        }
        log.pending.push(RecordedDraw {
            program,
            element_count: call.element_count,
            textured,
            filter: call.filter,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        self.record_call();
        if !self.in_frame {
            return Err(Error::Gpu("no frame in progress".to_string()));
        }
        self.in_frame = false;
        let mut log = self.log.borrow_mut();
        let frame = std::mem::take(&mut log.pending);
        log.frames.push(frame);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.record_call();
        self.size = (width, height);
        self.log.borrow_mut().resizes.push((width, height));
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::ShaderUniforms;
    use crate::shaders::SIMPLE_SHADER;

    fn descriptor(label: &'static str) -> ProgramDescriptor {
        ProgramDescriptor {
            label,
            source: SIMPLE_SHADER,
            layout: VertexLayout::Color,
            primitive: Primitive::Triangles,
            textured: false,
            overlay: false,
        }
    }

    #[test]
    fn test_handles_are_never_reused() {
        let mut backend = HeadlessBackend::default();
        let a = backend.create_vertex_buffer("a", &[]).unwrap();
        backend.destroy_buffer(a);
        let b = backend.create_vertex_buffer("b", &[]).unwrap();
        assert_ne!(a, b);

        backend.destroy_buffer(a);
        let log = backend.recorder();
        assert_eq!(log.log().invalid_destroys, 1);
        assert_eq!(log.log().live_buffers.len(), 1);
    }

    #[test]
    fn test_failing_frames_recover() {
        let mut backend = HeadlessBackend::default().with_failing_frames(1);
        let recorder = backend.recorder();
        assert!(backend.begin_frame([0.0; 4]).is_err());
        backend.begin_frame([0.0; 4]).unwrap();
        backend.end_frame().unwrap();
        assert_eq!(recorder.frame_count(), 1);
    }

    #[test]
    fn test_failing_program() {
        let mut backend = HeadlessBackend::default().with_failing_program("Broken");
        assert!(backend.create_program(&descriptor("Broken")).is_err());
        assert!(backend.create_program(&descriptor("Fine")).is_ok());
    }

    #[test]
    fn test_draws_are_grouped_by_frame() {
        let mut backend = HeadlessBackend::default();
        let recorder = backend.recorder();
        let program = backend.create_program(&descriptor("Simple")).unwrap();
        let buffer = backend.create_vertex_buffer("vb", &[0; 24]).unwrap();
        let uniforms = ShaderUniforms::default();
        let call = DrawCall {
            program,
            vertex_buffer: buffer,
            element_count: 3,
            uniforms: &uniforms,
            texture: None,
            filter: FilterMode::Linear,
        };

        assert!(backend.draw(&call).is_err());
        backend.begin_frame([0.0; 4]).unwrap();
        backend.draw(&call).unwrap();
        backend.end_frame().unwrap();

        assert_eq!(recorder.frame_count(), 1);
        assert_eq!(recorder.log().last_frame_programs(), vec!["Simple"]);
    }
}

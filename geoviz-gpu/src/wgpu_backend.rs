//! wgpu implementation of [`GraphicsBackend`] presenting to a window surface

use std::collections::HashMap;

use geoviz_core::{Error, Result};

use crate::backend::*;
use crate::device::{GpuContext, DEPTH_FORMAT};
use crate::vertex::{ColorVertex, LitVertex, ShaderUniforms, TexturedVertex};

/// Surface-level rendering configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub enable_depth_test: bool,
    pub present_mode: wgpu::PresentMode,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enable_depth_test: true,
            present_mode: wgpu::PresentMode::AutoVsync,
        }
    }
}

struct Program {
    pipeline: wgpu::RenderPipeline,
    primitive: Primitive,
    textured: bool,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// A draw with its per-draw bind groups already built
struct PreparedDraw {
    program: ProgramId,
    vertex_buffer: BufferId,
    element_count: u32,
    uniforms: wgpu::BindGroup,
    texture: Option<wgpu::BindGroup>,
}

struct PendingFrame {
    clear_color: wgpu::Color,
    draws: Vec<PreparedDraw>,
}

/// Backend drawing into a window surface.
///
/// Draws are queued between `begin_frame` and `end_frame`, then recorded
/// into a single render pass and presented.
pub struct WgpuBackend {
    context: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    linear_sampler: wgpu::Sampler,
    nearest_sampler: wgpu::Sampler,
    programs: HashMap<ProgramId, Program>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, GpuTexture>,
    frame: Option<PendingFrame>,
    config: BackendConfig,
    next_id: u64,
}

impl WgpuBackend {
    /// Create a backend presenting to `target` at the given framebuffer size
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        config: BackendConfig,
    ) -> Result<Self> {
        let instance = GpuContext::create_instance();
        let surface = instance
            .create_surface(target)
            .map_err(|e| Error::Gpu(format!("Failed to create surface: {:?}", e)))?;
        let context = GpuContext::new(instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&context.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("Surface reports no supported formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: config.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &surface_config);

        let uniform_layout = context.create_bind_group_layout(
            "uniform_bind_group_layout",
            &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        );
        let texture_layout = context.create_bind_group_layout(
            "texture_bind_group_layout",
            &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        );

        let sampler = |filter: wgpu::FilterMode| {
            context.device.create_sampler(&wgpu::SamplerDescriptor {
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                ..Default::default()
            })
        };
        let linear_sampler = sampler(wgpu::FilterMode::Linear);
        let nearest_sampler = sampler(wgpu::FilterMode::Nearest);

        let depth_view = context.create_depth_view(surface_config.width, surface_config.height);

        log::info!(
            "wgpu backend ready: {}x{} {:?}",
            surface_config.width,
            surface_config.height,
            surface_format
        );

        Ok(Self {
            context,
            surface,
            surface_config,
            depth_view,
            uniform_layout,
            texture_layout,
            linear_sampler,
            nearest_sampler,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            frame: None,
            config,
            next_id: 1,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn build_pipeline(&self, descriptor: &ProgramDescriptor) -> wgpu::RenderPipeline {
        let shader = self.context.create_shader_module(descriptor.label, descriptor.source);

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if descriptor.textured {
            vec![&self.uniform_layout, &self.texture_layout]
        } else {
            vec![&self.uniform_layout]
        };
        let layout = self
            .context
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(descriptor.label),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

        // Points expand to one instanced quad per vertex
        let step_mode = match descriptor.primitive {
            Primitive::Points => wgpu::VertexStepMode::Instance,
            Primitive::Lines | Primitive::Triangles => wgpu::VertexStepMode::Vertex,
        };
        let vertex_layout = match descriptor.layout {
            VertexLayout::Color => ColorVertex::desc(step_mode),
            VertexLayout::Lit => LitVertex::desc(step_mode),
            VertexLayout::Textured => TexturedVertex::desc(step_mode),
        };
        let topology = match descriptor.primitive {
            Primitive::Lines => wgpu::PrimitiveTopology::LineList,
            Primitive::Points | Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
        };

        let depth_stencil = self.config.enable_depth_test.then(|| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: !descriptor.overlay,
            depth_compare: if descriptor.overlay {
                wgpu::CompareFunction::Always
            } else {
                wgpu::CompareFunction::LessEqual
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        self.context
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(descriptor.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[vertex_layout],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            })
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.context.device, &self.surface_config);
        self.depth_view = self
            .context
            .create_depth_view(self.surface_config.width, self.surface_config.height);
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramId> {
        self.context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.build_pipeline(descriptor);
        if let Some(error) = pollster::block_on(self.context.device.pop_error_scope()) {
            return Err(Error::Gpu(format!("{}: {}", descriptor.label, error)));
        }
        let id = ProgramId(self.next_id());
        self.programs.insert(
            id,
            Program {
                pipeline,
                primitive: descriptor.primitive,
                textured: descriptor.textured,
            },
        );
        log::debug!("compiled {} as {}", descriptor.label, id);
        Ok(id)
    }

    fn destroy_program(&mut self, id: ProgramId) {
        self.programs.remove(&id);
    }

    fn create_vertex_buffer(&mut self, label: &str, contents: &[u8]) -> Result<BufferId> {
        let buffer = self
            .context
            .create_buffer_init(label, contents, wgpu::BufferUsages::VERTEX);
        let id = BufferId(self.next_id());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.remove(&id) {
            buffer.destroy();
        }
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<TextureId> {
        if width == 0 || height == 0 || rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(Error::InvalidData(format!(
                "texture {label} has {} bytes for {width}x{height}",
                rgba.len()
            )));
        }
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.context.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.next_id());
        self.textures.insert(
            id,
            GpuTexture {
                _texture: texture,
                view,
            },
        );
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<()> {
        if self.frame.is_some() {
            return Err(Error::Gpu("frame already in progress".to_string()));
        }
        self.frame = Some(PendingFrame {
            clear_color: wgpu::Color {
                r: clear_color[0] as f64,
                g: clear_color[1] as f64,
                b: clear_color[2] as f64,
                a: clear_color[3] as f64,
            },
            draws: Vec::new(),
        });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        if self.frame.is_none() {
            return Err(Error::Gpu("draw outside of a frame".to_string()));
        }
        let program = self
            .programs
            .get(&call.program)
            .ok_or_else(|| Error::Gpu(format!("unknown {}", call.program)))?;
        if !self.buffers.contains_key(&call.vertex_buffer) {
            return Err(Error::Gpu(format!("unknown buffer {:?}", call.vertex_buffer)));
        }

        let uniform_buffer = self.context.create_buffer_init(
            "Uniform Buffer",
            bytemuck::bytes_of::<ShaderUniforms>(call.uniforms),
            wgpu::BufferUsages::UNIFORM,
        );
        let uniforms = self.context.create_bind_group(
            "uniform_bind_group",
            &self.uniform_layout,
            &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        );

        let texture = match (program.textured, call.texture) {
            (true, Some(id)) => {
                let texture = self
                    .textures
                    .get(&id)
                    .ok_or_else(|| Error::Gpu(format!("unknown texture {id:?}")))?;
                let sampler = match call.filter {
                    FilterMode::Linear => &self.linear_sampler,
                    FilterMode::Nearest => &self.nearest_sampler,
                };
                Some(self.context.create_bind_group(
                    "texture_bind_group",
                    &self.texture_layout,
                    &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(sampler),
                        },
                    ],
                ))
            }
            (true, None) => return Err(Error::Gpu(format!("{} needs a texture", call.program))),
            (false, _) => None,
        };

        if let Some(frame) = self.frame.as_mut() {
            frame.draws.push(PreparedDraw {
                program: call.program,
                vertex_buffer: call.vertex_buffer,
                element_count: call.element_count,
                uniforms,
                texture,
            });
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| Error::Gpu("no frame in progress".to_string()))?;

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.reconfigure();
                return Err(Error::Gpu("surface lost, frame skipped".to_string()));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                return Err(Error::Gpu("surface timed out, frame skipped".to_string()));
            }
            Err(e) => return Err(Error::Gpu(format!("Failed to get surface texture: {:?}", e))),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: self.config.enable_depth_test.then(|| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &frame.draws {
                // Handles may have been released after the draw was queued
                let (Some(program), Some(buffer)) = (
                    self.programs.get(&draw.program),
                    self.buffers.get(&draw.vertex_buffer),
                ) else {
                    continue;
                };
                if draw.element_count == 0 {
                    continue;
                }
                render_pass.set_pipeline(&program.pipeline);
                render_pass.set_bind_group(0, &draw.uniforms, &[]);
                if let Some(texture) = &draw.texture {
                    render_pass.set_bind_group(1, texture, &[]);
                }
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                match program.primitive {
                    Primitive::Points => render_pass.draw(0..6, 0..draw.element_count),
                    Primitive::Lines | Primitive::Triangles => {
                        render_pass.draw(0..draw.element_count, 0..1)
                    }
                }
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.reconfigure();
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }
}

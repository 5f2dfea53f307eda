//! Vertex and uniform layouts shared by every program

use bytemuck::{Pod, Zeroable};
use nalgebra::Matrix4;

/// Position plus flat color, for unlit points, lines and triangles
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl ColorVertex {
    pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        // Position
        0 => Float32x3,
        // Color
        1 => Float32x3,
    ];

    /// Vertex buffer layout descriptor
    pub fn desc<'a>(step_mode: wgpu::VertexStepMode) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ColorVertex>() as wgpu::BufferAddress,
            step_mode,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Position, normal and color, for lit points and triangles
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LitVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl LitVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }

    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        // Position
        0 => Float32x3,
        // Normal
        1 => Float32x3,
        // Color
        2 => Float32x3,
    ];

    /// Vertex buffer layout descriptor
    pub fn desc<'a>(step_mode: wgpu::VertexStepMode) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LitVertex>() as wgpu::BufferAddress,
            step_mode,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Position, normal and texture coordinate, for textured triangles and images
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl TexturedVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
    }

    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        // Position
        0 => Float32x3,
        // Normal
        1 => Float32x3,
        // UV
        2 => Float32x2,
    ];

    /// Vertex buffer layout descriptor
    pub fn desc<'a>(step_mode: wgpu::VertexStepMode) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TexturedVertex>() as wgpu::BufferAddress,
            step_mode,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-draw uniform block, bound at group 0 binding 0 in every program
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ShaderUniforms {
    pub mvp: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub light_position: [f32; 4],
    pub light_color: [f32; 4],
    pub camera_position: [f32; 4],
    pub default_color: [f32; 4],
    /// Point size in pixels, viewport width, viewport height, lighting on (0/1)
    pub params: [f32; 4],
    /// Image quad scale in x and y
    pub image_scale: [f32; 4],
}

impl Default for ShaderUniforms {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        Self {
            mvp: identity,
            view: identity,
            model: identity,
            light_position: [0.0, 0.0, 0.0, 1.0],
            light_color: [1.0, 1.0, 1.0, 1.0],
            camera_position: [0.0, 0.0, 0.0, 1.0],
            default_color: [1.0, 1.0, 1.0, 1.0],
            params: [1.0, 1.0, 1.0, 1.0],
            image_scale: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(std::mem::size_of::<ColorVertex>(), 24);
        assert_eq!(std::mem::size_of::<LitVertex>(), 36);
        assert_eq!(std::mem::size_of::<TexturedVertex>(), 32);
        // Uniform buffers need 16-byte granularity
        assert_eq!(std::mem::size_of::<ShaderUniforms>() % 16, 0);
    }
}

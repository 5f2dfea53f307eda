//! Render units and the techniques they implement

mod prepare;
mod shader_wrapper;

pub use prepare::{PreparedBinding, TexturePixels, VertexData};
pub use shader_wrapper::{ShaderWrapper, UnitState};

use geoviz_core::{Geometry, Result};
use geoviz_gpu::shaders::*;
use geoviz_gpu::{Primitive, ProgramDescriptor, ShaderUniforms, VertexLayout};

use crate::gl_helper::OPENGL_TO_WGPU_MATRIX;
use crate::render_option::{ImageStretchOption, RenderOption};
use crate::view_control::ViewControl;

/// One way of drawing a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technique {
    /// Unlit points in their stored or mapped colors
    SimplePoint,
    PhongPoint,
    /// Points colored by their normal
    NormalPoint,
    /// One line segment per point along its normal
    PointNormals,
    SimpleMesh,
    TextureSimpleMesh,
    PhongMesh,
    TexturePhongMesh,
    /// Triangles colored by their normal
    NormalMesh,
    /// Triangle edges as lines
    Wireframe,
    /// Screen-space quad showing an image
    Image,
}

impl Technique {
    /// Unit name, also used as the program label
    pub fn label(self) -> &'static str {
        match self {
            Technique::SimplePoint => "SimpleShaderForPointCloud",
            Technique::PhongPoint => "PhongShaderForPointCloud",
            Technique::NormalPoint => "NormalShaderForPointCloud",
            Technique::PointNormals => "SimpleShaderForPointCloudNormal",
            Technique::SimpleMesh => "SimpleShaderForTriangleMesh",
            Technique::TextureSimpleMesh => "TextureSimpleShaderForTriangleMesh",
            Technique::PhongMesh => "PhongShaderForTriangleMesh",
            Technique::TexturePhongMesh => "TexturePhongShaderForTriangleMesh",
            Technique::NormalMesh => "NormalShaderForTriangleMesh",
            Technique::Wireframe => "SimpleShaderForTriangleMeshWireFrame",
            Technique::Image => "ImageShaderForImage",
        }
    }

    pub fn descriptor(self) -> ProgramDescriptor {
        let (source, layout, primitive) = match self {
            Technique::SimplePoint | Technique::NormalPoint => {
                (SIMPLE_POINT_SHADER, VertexLayout::Color, Primitive::Points)
            }
            Technique::PhongPoint => (PHONG_POINT_SHADER, VertexLayout::Lit, Primitive::Points),
            Technique::PointNormals | Technique::Wireframe => {
                (SIMPLE_SHADER, VertexLayout::Color, Primitive::Lines)
            }
            Technique::SimpleMesh | Technique::NormalMesh => {
                (SIMPLE_SHADER, VertexLayout::Color, Primitive::Triangles)
            }
            Technique::PhongMesh => (PHONG_SHADER, VertexLayout::Lit, Primitive::Triangles),
            Technique::TextureSimpleMesh => {
                (TEXTURE_SIMPLE_SHADER, VertexLayout::Textured, Primitive::Triangles)
            }
            Technique::TexturePhongMesh => {
                (TEXTURE_PHONG_SHADER, VertexLayout::Textured, Primitive::Triangles)
            }
            Technique::Image => (IMAGE_SHADER, VertexLayout::Textured, Primitive::Triangles),
        };
        ProgramDescriptor {
            label: self.label(),
            source,
            layout,
            primitive,
            textured: self.is_textured(),
            overlay: self == Technique::Image,
        }
    }

    pub fn is_textured(self) -> bool {
        matches!(
            self,
            Technique::TextureSimpleMesh | Technique::TexturePhongMesh | Technique::Image
        )
    }

    /// Vertex data (and texture) for `geometry` under the current options
    pub fn prepare(self, geometry: &Geometry, option: &RenderOption, view: &ViewControl) -> Result<PreparedBinding> {
        prepare::prepare(self, geometry, option, view)
    }

    /// Per-draw uniforms for the current camera and options
    pub fn uniforms(self, geometry: &Geometry, option: &RenderOption, view: &ViewControl) -> ShaderUniforms {
        let (width, height) = view.window_size();
        let eye = view.eye();
        let [r, g, b] = option.default_mesh_color;
        let [lr, lg, lb] = option.light_color;
        let mut uniforms = ShaderUniforms {
            mvp: (OPENGL_TO_WGPU_MATRIX * view.mvp_matrix()).into(),
            view: (*view.view_matrix()).into(),
            model: (*view.model_matrix()).into(),
            light_position: [eye.x, eye.y, eye.z, 1.0],
            light_color: [lr, lg, lb, 1.0],
            camera_position: [eye.x, eye.y, eye.z, 1.0],
            default_color: [r, g, b, 1.0],
            params: [
                option.point_size,
                width.max(1) as f32,
                height.max(1) as f32,
                if option.light_on { 1.0 } else { 0.0 },
            ],
            ..ShaderUniforms::default()
        };
        if let (Technique::Image, Some(image)) = (self, geometry.as_image()) {
            let [sx, sy] = image_scale(
                option.image_stretch_option,
                (image.width, image.height),
                (width, height),
            );
            uniforms.image_scale = [sx, sy, 1.0, 1.0];
        }
        uniforms
    }
}

/// Scale of the full-screen image quad for a given stretch option
pub fn image_scale(
    stretch: ImageStretchOption,
    (image_width, image_height): (u32, u32),
    (window_width, window_height): (u32, u32),
) -> [f32; 2] {
    if window_width == 0 || window_height == 0 || image_width == 0 || image_height == 0 {
        return [1.0, 1.0];
    }
    let ratio_x = image_width as f32 / window_width as f32;
    let ratio_y = image_height as f32 / window_height as f32;
    match stretch {
        ImageStretchOption::OriginalSize => [ratio_x, ratio_y],
        ImageStretchOption::StretchKeepRatio => {
            let ratio = ratio_x.max(ratio_y);
            [ratio_x / ratio, ratio_y / ratio]
        }
        ImageStretchOption::StretchWithWindow => [1.0, 1.0],
    }
}

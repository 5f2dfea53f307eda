//! Per-geometry renderers choosing render units each frame

use geoviz_core::{Error, Geometry, GeometryKind, Result, SharedGeometry};
use geoviz_gpu::SharedBackend;

use crate::render_option::{MeshColorOption, PointColorOption, RenderOption};
use crate::report::RenderReport;
use crate::shader::{ShaderWrapper, Technique};
use crate::view_control::ViewControl;

/// Geometry reference and visibility shared by every renderer kind
#[derive(Debug)]
struct RendererBase {
    geometry: Option<SharedGeometry>,
    visible: bool,
}

impl RendererBase {
    fn new() -> Self {
        Self {
            geometry: None,
            visible: true,
        }
    }

    fn add_geometry(&mut self, expected: GeometryKind, geometry: SharedGeometry) -> Result<()> {
        let found = geometry.kind();
        if found != expected {
            return Err(Error::UnsupportedGeometryKind {
                expected: Some(expected),
                found,
            });
        }
        self.geometry = Some(geometry);
        Ok(())
    }
}

fn render_unit(
    report: &mut RenderReport,
    unit: &mut ShaderWrapper,
    geometry: &Geometry,
    option: &RenderOption,
    view: &ViewControl,
) {
    let result = unit.render(geometry, option, view);
    if let Err(e) = &result {
        log::warn!("{} failed to render: {}", unit.name(), e);
    }
    report.record(unit.name(), result);
}

fn invalidate_all<'a>(units: impl IntoIterator<Item = &'a mut ShaderWrapper>) -> Result<()> {
    let mut first_error = None;
    for unit in units {
        if let Err(e) = unit.invalidate() {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Renders point clouds as points, optionally with normal segments
#[derive(Debug)]
pub struct PointCloudRenderer {
    base: RendererBase,
    simple_point: ShaderWrapper,
    phong_point: ShaderWrapper,
    normal_point: ShaderWrapper,
    simple_point_normal: ShaderWrapper,
}

impl PointCloudRenderer {
    pub fn new(backend: &SharedBackend) -> Self {
        Self {
            base: RendererBase::new(),
            simple_point: ShaderWrapper::new(Technique::SimplePoint, backend.clone()),
            phong_point: ShaderWrapper::new(Technique::PhongPoint, backend.clone()),
            normal_point: ShaderWrapper::new(Technique::NormalPoint, backend.clone()),
            simple_point_normal: ShaderWrapper::new(Technique::PointNormals, backend.clone()),
        }
    }

    fn units_mut(&mut self) -> [&mut ShaderWrapper; 4] {
        [
            &mut self.simple_point,
            &mut self.phong_point,
            &mut self.normal_point,
            &mut self.simple_point_normal,
        ]
    }

    fn render_geometry(&mut self, geometry: &Geometry, option: &RenderOption, view: &ViewControl, report: &mut RenderReport) {
        if geometry.has_normals() {
            if option.point_color_option == PointColorOption::Normal {
                render_unit(report, &mut self.normal_point, geometry, option, view);
            } else {
                render_unit(report, &mut self.phong_point, geometry, option, view);
            }
            if option.point_show_normal {
                render_unit(report, &mut self.simple_point_normal, geometry, option, view);
            }
        } else {
            render_unit(report, &mut self.simple_point, geometry, option, view);
        }
    }
}

/// Renders triangle meshes lit, unlit, textured or by normal, with an
/// optional wireframe overlay
#[derive(Debug)]
pub struct TriangleMeshRenderer {
    base: RendererBase,
    simple_mesh: ShaderWrapper,
    texture_simple_mesh: ShaderWrapper,
    phong_mesh: ShaderWrapper,
    texture_phong_mesh: ShaderWrapper,
    normal_mesh: ShaderWrapper,
    simple_wireframe: ShaderWrapper,
}

impl TriangleMeshRenderer {
    pub fn new(backend: &SharedBackend) -> Self {
        Self {
            base: RendererBase::new(),
            simple_mesh: ShaderWrapper::new(Technique::SimpleMesh, backend.clone()),
            texture_simple_mesh: ShaderWrapper::new(Technique::TextureSimpleMesh, backend.clone()),
            phong_mesh: ShaderWrapper::new(Technique::PhongMesh, backend.clone()),
            texture_phong_mesh: ShaderWrapper::new(Technique::TexturePhongMesh, backend.clone()),
            normal_mesh: ShaderWrapper::new(Technique::NormalMesh, backend.clone()),
            simple_wireframe: ShaderWrapper::new(Technique::Wireframe, backend.clone()),
        }
    }

    fn units_mut(&mut self) -> [&mut ShaderWrapper; 6] {
        [
            &mut self.simple_mesh,
            &mut self.texture_simple_mesh,
            &mut self.phong_mesh,
            &mut self.texture_phong_mesh,
            &mut self.normal_mesh,
            &mut self.simple_wireframe,
        ]
    }

    fn render_geometry(&mut self, geometry: &Geometry, option: &RenderOption, view: &ViewControl, report: &mut RenderReport) {
        let textured = option.mesh_color_option == MeshColorOption::Color
            && geometry.has_triangle_uvs()
            && geometry.has_texture();
        if geometry.has_triangle_normals() && geometry.has_vertex_normals() {
            if option.mesh_color_option == MeshColorOption::Normal {
                render_unit(report, &mut self.normal_mesh, geometry, option, view);
            } else if textured {
                render_unit(report, &mut self.texture_phong_mesh, geometry, option, view);
            } else {
                render_unit(report, &mut self.phong_mesh, geometry, option, view);
            }
        } else if textured {
            render_unit(report, &mut self.texture_simple_mesh, geometry, option, view);
        } else {
            render_unit(report, &mut self.simple_mesh, geometry, option, view);
        }
        if option.mesh_show_wireframe {
            render_unit(report, &mut self.simple_wireframe, geometry, option, view);
        }
    }
}

/// Renders an image as a screen-space quad
#[derive(Debug)]
pub struct ImageRenderer {
    base: RendererBase,
    image: ShaderWrapper,
}

impl ImageRenderer {
    pub fn new(backend: &SharedBackend) -> Self {
        Self {
            base: RendererBase::new(),
            image: ShaderWrapper::new(Technique::Image, backend.clone()),
        }
    }
}

/// Renders the axis gizmo when the coordinate frame is switched on
#[derive(Debug)]
pub struct CoordinateFrameRenderer {
    base: RendererBase,
    phong: ShaderWrapper,
}

impl CoordinateFrameRenderer {
    pub fn new(backend: &SharedBackend) -> Self {
        Self {
            base: RendererBase::new(),
            phong: ShaderWrapper::new(Technique::PhongMesh, backend.clone()),
        }
    }
}

/// Renderer for one geometry instance, one variant per geometry kind
#[derive(Debug)]
pub enum GeometryRenderer {
    PointCloud(PointCloudRenderer),
    TriangleMesh(TriangleMeshRenderer),
    Image(ImageRenderer),
    CoordinateFrame(CoordinateFrameRenderer),
}

impl GeometryRenderer {
    /// Renderer accepting geometries of `kind`
    pub fn for_kind(kind: GeometryKind, backend: &SharedBackend) -> Result<Self> {
        match kind {
            GeometryKind::PointCloud => Ok(GeometryRenderer::PointCloud(PointCloudRenderer::new(backend))),
            GeometryKind::TriangleMesh => Ok(GeometryRenderer::TriangleMesh(TriangleMeshRenderer::new(backend))),
            GeometryKind::Image => Ok(GeometryRenderer::Image(ImageRenderer::new(backend))),
            GeometryKind::CoordinateFrameMesh => {
                Ok(GeometryRenderer::CoordinateFrame(CoordinateFrameRenderer::new(backend)))
            }
            GeometryKind::Unspecified => Err(Error::UnsupportedGeometryKind {
                expected: None,
                found: kind,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GeometryRenderer::PointCloud(_) => "PointCloudRenderer",
            GeometryRenderer::TriangleMesh(_) => "TriangleMeshRenderer",
            GeometryRenderer::Image(_) => "ImageRenderer",
            GeometryRenderer::CoordinateFrame(_) => "CoordinateFrameRenderer",
        }
    }

    pub fn expected_kind(&self) -> GeometryKind {
        match self {
            GeometryRenderer::PointCloud(_) => GeometryKind::PointCloud,
            GeometryRenderer::TriangleMesh(_) => GeometryKind::TriangleMesh,
            GeometryRenderer::Image(_) => GeometryKind::Image,
            GeometryRenderer::CoordinateFrame(_) => GeometryKind::CoordinateFrameMesh,
        }
    }

    fn base(&self) -> &RendererBase {
        match self {
            GeometryRenderer::PointCloud(r) => &r.base,
            GeometryRenderer::TriangleMesh(r) => &r.base,
            GeometryRenderer::Image(r) => &r.base,
            GeometryRenderer::CoordinateFrame(r) => &r.base,
        }
    }

    fn base_mut(&mut self) -> &mut RendererBase {
        match self {
            GeometryRenderer::PointCloud(r) => &mut r.base,
            GeometryRenderer::TriangleMesh(r) => &mut r.base,
            GeometryRenderer::Image(r) => &mut r.base,
            GeometryRenderer::CoordinateFrame(r) => &mut r.base,
        }
    }

    /// Every render unit this renderer owns
    pub fn units(&self) -> Vec<&ShaderWrapper> {
        match self {
            GeometryRenderer::PointCloud(r) => vec![
                &r.simple_point,
                &r.phong_point,
                &r.normal_point,
                &r.simple_point_normal,
            ],
            GeometryRenderer::TriangleMesh(r) => vec![
                &r.simple_mesh,
                &r.texture_simple_mesh,
                &r.phong_mesh,
                &r.texture_phong_mesh,
                &r.normal_mesh,
                &r.simple_wireframe,
            ],
            GeometryRenderer::Image(r) => vec![&r.image],
            GeometryRenderer::CoordinateFrame(r) => vec![&r.phong],
        }
    }

    /// Store `geometry` if it has this renderer's kind, then invalidate
    pub fn add_geometry(&mut self, geometry: SharedGeometry) -> Result<()> {
        let expected = self.expected_kind();
        self.base_mut().add_geometry(expected, geometry)?;
        self.update_geometry()
    }

    /// Mark every unit's bound data stale
    pub fn update_geometry(&mut self) -> Result<()> {
        match self {
            GeometryRenderer::PointCloud(r) => invalidate_all(r.units_mut()),
            GeometryRenderer::TriangleMesh(r) => invalidate_all(r.units_mut()),
            GeometryRenderer::Image(r) => r.image.invalidate(),
            GeometryRenderer::CoordinateFrame(r) => r.phong.invalidate(),
        }
    }

    pub fn geometry(&self) -> Option<&SharedGeometry> {
        self.base().geometry.as_ref()
    }

    /// Whether this renderer draws exactly `geometry`
    pub fn has_geometry(&self, geometry: &SharedGeometry) -> bool {
        self.geometry().is_some_and(|own| own.ptr_eq(geometry))
    }

    pub fn is_visible(&self) -> bool {
        self.base().visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.base_mut().visible = visible;
    }

    /// Draw the geometry with the units its attributes and the options select.
    ///
    /// Hidden, missing and empty geometries invoke nothing. A unit failure
    /// does not stop the remaining selected units.
    pub fn render(&mut self, option: &RenderOption, view: &ViewControl) -> RenderReport {
        let mut report = RenderReport::new();
        if !self.is_visible() {
            return report;
        }
        if let GeometryRenderer::CoordinateFrame(_) = self {
            if !option.show_coordinate_frame {
                return report;
            }
        }
        let Some(shared) = self.geometry().cloned() else {
            return report;
        };
        let Some(geometry) = shared.try_borrow() else {
            log::warn!("{}: geometry is mutably borrowed, skipping", self.name());
            report.record(
                self.name(),
                Err(Error::InvalidData("geometry is mutably borrowed".to_string())),
            );
            return report;
        };
        if geometry.is_empty() {
            return report;
        }

        match self {
            GeometryRenderer::PointCloud(r) => r.render_geometry(&geometry, option, view, &mut report),
            GeometryRenderer::TriangleMesh(r) => r.render_geometry(&geometry, option, view, &mut report),
            GeometryRenderer::Image(r) => render_unit(&mut report, &mut r.image, &geometry, option, view),
            GeometryRenderer::CoordinateFrame(r) => render_unit(&mut report, &mut r.phong, &geometry, option, view),
        }
        report
    }
}

//! CPU-side vertex preparation for every technique

use geoviz_core::{
    AxisAlignedBoundingBox, Color3f, Error, Geometry, GeometryKind, Image, PointCloud, Result,
    TriangleMesh, Vector3f,
};
use geoviz_gpu::{ColorVertex, LitVertex, TexturedVertex};
use rayon::prelude::*;

use super::Technique;
use crate::render_option::{ColorSource, MeshShadeOption, RenderOption};
use crate::view_control::ViewControl;

/// Vertices in the layout of one program
#[derive(Debug, Clone, PartialEq)]
pub enum VertexData {
    Color(Vec<ColorVertex>),
    Lit(Vec<LitVertex>),
    Textured(Vec<TexturedVertex>),
}

impl VertexData {
    pub fn len(&self) -> usize {
        match self {
            VertexData::Color(vertices) => vertices.len(),
            VertexData::Lit(vertices) => vertices.len(),
            VertexData::Textured(vertices) => vertices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VertexData::Color(vertices) => bytemuck::cast_slice(vertices),
            VertexData::Lit(vertices) => bytemuck::cast_slice(vertices),
            VertexData::Textured(vertices) => bytemuck::cast_slice(vertices),
        }
    }
}

/// RGBA8 pixels to upload as a texture
#[derive(Debug, Clone, PartialEq)]
pub struct TexturePixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl From<&Image> for TexturePixels {
    fn from(image: &Image) -> Self {
        Self {
            width: image.width,
            height: image.height,
            rgba: image.to_rgba8(),
        }
    }
}

/// Everything a unit uploads on bind
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBinding {
    pub vertices: VertexData,
    pub texture: Option<TexturePixels>,
}

const OVERLAY_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

pub(super) fn prepare(
    technique: Technique,
    geometry: &Geometry,
    option: &RenderOption,
    view: &ViewControl,
) -> Result<PreparedBinding> {
    let bounds = view.bounding_box();
    let (vertices, texture) = match technique {
        Technique::SimplePoint => (VertexData::Color(simple_points(point_cloud(geometry)?, option, bounds)), None),
        Technique::PhongPoint => (VertexData::Lit(phong_points(with_normals(point_cloud(geometry)?)?, option, bounds)), None),
        Technique::NormalPoint => (VertexData::Color(normal_points(with_normals(point_cloud(geometry)?)?)), None),
        Technique::PointNormals => {
            let length = option.point_size * 0.01 * bounds.max_extent();
            (VertexData::Color(point_normal_lines(with_normals(point_cloud(geometry)?)?, length)), None)
        }
        Technique::SimpleMesh => (VertexData::Color(simple_mesh(checked_mesh(geometry)?, option, bounds)), None),
        Technique::PhongMesh => (VertexData::Lit(phong_mesh(checked_mesh(geometry)?, option, bounds)?), None),
        Technique::NormalMesh => (VertexData::Color(normal_mesh(checked_mesh(geometry)?, option)?), None),
        Technique::TextureSimpleMesh | Technique::TexturePhongMesh => {
            let mesh = checked_mesh(geometry)?;
            let texture = mesh
                .texture
                .as_ref()
                .filter(|_| mesh.has_texture() && mesh.has_triangle_uvs())
                .ok_or_else(|| Error::InvalidData("mesh has no texture coordinates or texture".to_string()))?;
            (VertexData::Textured(textured_mesh(mesh, option)), Some(TexturePixels::from(texture)))
        }
        Technique::Wireframe => (VertexData::Color(wireframe(checked_mesh(geometry)?)), None),
        Technique::Image => {
            let image = geometry.as_image().ok_or_else(|| mismatch(GeometryKind::Image, geometry))?;
            if image.is_empty() {
                return Err(Error::InvalidData("image is empty".to_string()));
            }
            (VertexData::Textured(image_quad()), Some(TexturePixels::from(image)))
        }
    };
    if vertices.is_empty() {
        return Err(Error::InvalidData(format!("{} has nothing to bind", technique.label())));
    }
    Ok(PreparedBinding { vertices, texture })
}

fn mismatch(expected: GeometryKind, geometry: &Geometry) -> Error {
    Error::UnsupportedGeometryKind {
        expected: Some(expected),
        found: geometry.kind(),
    }
}

fn point_cloud(geometry: &Geometry) -> Result<&PointCloud> {
    geometry
        .as_point_cloud()
        .ok_or_else(|| mismatch(GeometryKind::PointCloud, geometry))
}

fn with_normals(cloud: &PointCloud) -> Result<&PointCloud> {
    if cloud.has_normals() {
        Ok(cloud)
    } else {
        Err(Error::InvalidData("point cloud has no normals".to_string()))
    }
}

/// The mesh behind `geometry`, with every triangle index in range
fn checked_mesh(geometry: &Geometry) -> Result<&TriangleMesh> {
    let mesh = geometry
        .as_mesh()
        .ok_or_else(|| mismatch(GeometryKind::TriangleMesh, geometry))?;
    let vertex_count = mesh.vertices.len();
    if let Some(triangle) = mesh
        .triangles
        .iter()
        .find(|triangle| triangle.iter().any(|&index| index as usize >= vertex_count))
    {
        return Err(Error::InvalidData(format!(
            "triangle {triangle:?} indexes past {vertex_count} vertices"
        )));
    }
    Ok(mesh)
}

fn normal_color(normal: &Vector3f) -> Color3f {
    normal * 0.5 + Color3f::repeat(0.5)
}

fn point_color(cloud: &PointCloud, index: usize, option: &RenderOption, bounds: &AxisAlignedBoundingBox) -> Color3f {
    let point = &cloud.points[index];
    let map = |axis: usize| option.color_map.color(bounds.percentage(axis, point[axis]));
    match option.point_color_source() {
        ColorSource::Stored | ColorSource::Uniform if cloud.has_colors() => cloud.colors[index],
        ColorSource::Stored | ColorSource::Uniform => map(2),
        ColorSource::Axis(axis) => map(axis),
        ColorSource::Normal if cloud.has_normals() => normal_color(&cloud.normals[index]),
        ColorSource::Normal if cloud.has_colors() => cloud.colors[index],
        ColorSource::Normal => map(2),
    }
}

fn simple_points(cloud: &PointCloud, option: &RenderOption, bounds: &AxisAlignedBoundingBox) -> Vec<ColorVertex> {
    cloud
        .points
        .par_iter()
        .enumerate()
        .map(|(i, point)| ColorVertex::new(point.coords.into(), point_color(cloud, i, option, bounds).into()))
        .collect()
}

fn phong_points(cloud: &PointCloud, option: &RenderOption, bounds: &AxisAlignedBoundingBox) -> Vec<LitVertex> {
    cloud
        .points
        .par_iter()
        .zip(cloud.normals.par_iter())
        .enumerate()
        .map(|(i, (point, normal))| {
            LitVertex::new(
                point.coords.into(),
                (*normal).into(),
                point_color(cloud, i, option, bounds).into(),
            )
        })
        .collect()
}

fn normal_points(cloud: &PointCloud) -> Vec<ColorVertex> {
    cloud
        .points
        .par_iter()
        .zip(cloud.normals.par_iter())
        .map(|(point, normal)| ColorVertex::new(point.coords.into(), normal_color(normal).into()))
        .collect()
}

fn point_normal_lines(cloud: &PointCloud, length: f32) -> Vec<ColorVertex> {
    cloud
        .points
        .par_iter()
        .zip(cloud.normals.par_iter())
        .flat_map_iter(|(point, normal)| {
            let tip = point + normal * length;
            [
                ColorVertex::new(point.coords.into(), OVERLAY_COLOR),
                ColorVertex::new(tip.coords.into(), OVERLAY_COLOR),
            ]
        })
        .collect()
}

fn mesh_color(mesh: &TriangleMesh, vertex: usize, option: &RenderOption, bounds: &AxisAlignedBoundingBox) -> Color3f {
    let position = &mesh.vertices[vertex];
    match option.mesh_color_source() {
        ColorSource::Stored if mesh.has_vertex_colors() => mesh.vertex_colors[vertex],
        ColorSource::Axis(axis) => option.color_map.color(bounds.percentage(axis, position[axis])),
        ColorSource::Normal if mesh.has_vertex_normals() => normal_color(&mesh.vertex_normals[vertex]),
        ColorSource::Stored | ColorSource::Normal | ColorSource::Uniform => option.default_mesh_color(),
    }
}

/// Normal of one triangle corner under the shade option, if the mesh has any
fn corner_normal(mesh: &TriangleMesh, triangle: usize, vertex: usize, shade: MeshShadeOption) -> Option<Vector3f> {
    let flat = mesh.has_triangle_normals().then(|| mesh.triangle_normals[triangle]);
    let smooth = mesh.has_vertex_normals().then(|| mesh.vertex_normals[vertex]);
    match shade {
        MeshShadeOption::FlatShade => flat.or(smooth),
        MeshShadeOption::SmoothShade => smooth.or(flat),
    }
}

/// Visit every triangle corner in parallel as `(triangle, corner, vertex)`
fn corners<T, F>(mesh: &TriangleMesh, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, usize, usize) -> T + Sync,
{
    let f = &f;
    mesh.triangles
        .par_iter()
        .enumerate()
        .flat_map_iter(move |(t, triangle)| {
            triangle
                .iter()
                .enumerate()
                .map(move |(corner, &vertex)| f(t, corner, vertex as usize))
        })
        .collect()
}

fn simple_mesh(mesh: &TriangleMesh, option: &RenderOption, bounds: &AxisAlignedBoundingBox) -> Vec<ColorVertex> {
    corners(mesh, |_, _, v| {
        ColorVertex::new(mesh.vertices[v].coords.into(), mesh_color(mesh, v, option, bounds).into())
    })
}

fn phong_mesh(mesh: &TriangleMesh, option: &RenderOption, bounds: &AxisAlignedBoundingBox) -> Result<Vec<LitVertex>> {
    if !mesh.has_triangle_normals() && !mesh.has_vertex_normals() {
        return Err(Error::InvalidData("mesh has no normals".to_string()));
    }
    let shade = option.mesh_shade_option;
    Ok(corners(mesh, |t, _, v| {
        let normal = corner_normal(mesh, t, v, shade).unwrap_or_else(Vector3f::zeros);
        LitVertex::new(
            mesh.vertices[v].coords.into(),
            normal.into(),
            mesh_color(mesh, v, option, bounds).into(),
        )
    }))
}

fn normal_mesh(mesh: &TriangleMesh, option: &RenderOption) -> Result<Vec<ColorVertex>> {
    if !mesh.has_triangle_normals() && !mesh.has_vertex_normals() {
        return Err(Error::InvalidData("mesh has no normals".to_string()));
    }
    let shade = option.mesh_shade_option;
    Ok(corners(mesh, |t, _, v| {
        let normal = corner_normal(mesh, t, v, shade).unwrap_or_else(Vector3f::zeros);
        ColorVertex::new(mesh.vertices[v].coords.into(), normal_color(&normal).into())
    }))
}

fn textured_mesh(mesh: &TriangleMesh, option: &RenderOption) -> Vec<TexturedVertex> {
    let shade = option.mesh_shade_option;
    corners(mesh, |t, corner, v| {
        let normal = corner_normal(mesh, t, v, shade).unwrap_or_else(Vector3f::zeros);
        let uv = mesh.triangle_uvs[3 * t + corner];
        TexturedVertex::new(mesh.vertices[v].coords.into(), normal.into(), uv.into())
    })
}

fn wireframe(mesh: &TriangleMesh) -> Vec<ColorVertex> {
    mesh.triangles
        .par_iter()
        .flat_map_iter(move |&[a, b, c]| {
            [(a, b), (b, c), (c, a)].into_iter().flat_map(move |(from, to)| {
                [
                    ColorVertex::new(mesh.vertices[from as usize].coords.into(), OVERLAY_COLOR),
                    ColorVertex::new(mesh.vertices[to as usize].coords.into(), OVERLAY_COLOR),
                ]
            })
        })
        .collect()
}

// Full-screen quad; image row 0 is the top of the screen
fn image_quad() -> Vec<TexturedVertex> {
    let corner = |x: f32, y: f32| TexturedVertex::new([x, y, 0.0], [0.0, 0.0, 1.0], [(x + 1.0) * 0.5, (1.0 - y) * 0.5]);
    vec![
        corner(-1.0, -1.0),
        corner(1.0, -1.0),
        corner(1.0, 1.0),
        corner(-1.0, -1.0),
        corner(1.0, 1.0),
        corner(-1.0, 1.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_option::{MeshColorOption, PointColorOption};
    use approx::assert_relative_eq;
    use geoviz_core::{Point3f, Vector2f};

    fn view_for(geometry: &Geometry) -> ViewControl {
        use geoviz_core::Drawable;
        let mut view = ViewControl::new();
        view.fit_in_geometry(&geometry.bounding_box());
        view
    }

    fn cloud_with_normals() -> Geometry {
        Geometry::PointCloud(
            PointCloud::from_points(vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(0.0, 0.0, 2.0)])
                .with_normals(vec![Vector3f::z(), -Vector3f::x()]),
        )
    }

    #[test]
    fn test_points_without_colors_use_height_map() {
        let geometry = Geometry::PointCloud(PointCloud::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
        ]));
        let option = RenderOption::default();
        let binding = prepare(Technique::SimplePoint, &geometry, &option, &view_for(&geometry)).unwrap();

        let VertexData::Color(vertices) = binding.vertices else {
            panic!("expected color vertices");
        };
        let low: Color3f = option.color_map.color(0.0);
        let high: Color3f = option.color_map.color(1.0);
        assert_eq!(vertices[0].color, <[f32; 3]>::from(low));
        assert_eq!(vertices[1].color, <[f32; 3]>::from(high));
    }

    #[test]
    fn test_normal_coloring() {
        let geometry = cloud_with_normals();
        let binding = prepare(Technique::NormalPoint, &geometry, &RenderOption::default(), &view_for(&geometry)).unwrap();
        let VertexData::Color(vertices) = binding.vertices else {
            panic!("expected color vertices");
        };
        assert_eq!(vertices[0].color, [0.5, 0.5, 1.0]);
        assert_eq!(vertices[1].color, [0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_normal_lines_scale_with_point_size() {
        let geometry = cloud_with_normals();
        let mut option = RenderOption::default();
        option.point_size = 10.0;
        let binding = prepare(Technique::PointNormals, &geometry, &option, &view_for(&geometry)).unwrap();
        let VertexData::Color(vertices) = binding.vertices else {
            panic!("expected color vertices");
        };
        assert_eq!(vertices.len(), 4);
        // 10 * 0.01 * extent 2
        assert_relative_eq!(vertices[1].position[2], 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_normals_fail_binding() {
        let geometry = Geometry::PointCloud(PointCloud::from_points(vec![Point3f::origin()]));
        let view = view_for(&geometry);
        assert!(prepare(Technique::PhongPoint, &geometry, &RenderOption::default(), &view).is_err());
    }

    #[test]
    fn test_mesh_colors_follow_option() {
        let mut mesh = TriangleMesh::create_box(1.0, 1.0, 1.0);
        mesh.paint_uniform_color(Color3f::new(1.0, 0.0, 0.0));
        let geometry = Geometry::TriangleMesh(mesh);
        let view = view_for(&geometry);

        let mut option = RenderOption::default();
        let VertexData::Color(colored) = prepare(Technique::SimpleMesh, &geometry, &option, &view).unwrap().vertices else {
            panic!("expected color vertices");
        };
        assert_eq!(colored.len(), 36);
        assert!(colored.iter().all(|v| v.color == [1.0, 0.0, 0.0]));

        option.mesh_color_option = MeshColorOption::Default;
        let VertexData::Color(gray) = prepare(Technique::SimpleMesh, &geometry, &option, &view).unwrap().vertices else {
            panic!("expected color vertices");
        };
        assert!(gray.iter().all(|v| v.color == option.default_mesh_color));
    }

    #[test]
    fn test_flat_and_smooth_normals() {
        let mut mesh = TriangleMesh::from_vertices_and_triangles(
            vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        mesh.compute_triangle_normals();
        mesh.vertex_normals = vec![Vector3f::x(); 3];
        let geometry = Geometry::TriangleMesh(mesh);
        let view = view_for(&geometry);

        let mut option = RenderOption::default();
        let VertexData::Lit(flat) = prepare(Technique::PhongMesh, &geometry, &option, &view).unwrap().vertices else {
            panic!("expected lit vertices");
        };
        assert_eq!(flat[0].normal, [0.0, 0.0, 1.0]);

        option.mesh_shade_option = MeshShadeOption::SmoothShade;
        let VertexData::Lit(smooth) = prepare(Technique::PhongMesh, &geometry, &option, &view).unwrap().vertices else {
            panic!("expected lit vertices");
        };
        assert_eq!(smooth[0].normal, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_out_of_range_triangle_is_rejected() {
        let mesh = TriangleMesh::from_vertices_and_triangles(vec![Point3f::origin(); 3], vec![[0, 1, 3]]);
        let geometry = Geometry::TriangleMesh(mesh);
        let view = view_for(&geometry);
        assert!(matches!(
            prepare(Technique::SimpleMesh, &geometry, &RenderOption::default(), &view),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_textured_mesh_uploads_texture() {
        let mut mesh = TriangleMesh::from_vertices_and_triangles(
            vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(1.0, 0.0, 0.0), Point3f::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2]],
        );
        mesh.triangle_uvs = vec![Vector2f::new(0.0, 0.0), Vector2f::new(1.0, 0.0), Vector2f::new(0.0, 1.0)];
        mesh.texture = Some(Image::new(2, 2, 3));
        let geometry = Geometry::TriangleMesh(mesh);
        let binding = prepare(Technique::TextureSimpleMesh, &geometry, &RenderOption::default(), &view_for(&geometry)).unwrap();

        let texture = binding.texture.unwrap();
        assert_eq!((texture.width, texture.height, texture.rgba.len()), (2, 2, 16));
        let VertexData::Textured(vertices) = binding.vertices else {
            panic!("expected textured vertices");
        };
        assert_eq!(vertices[1].uv, [1.0, 0.0]);
    }

    #[test]
    fn test_wireframe_has_three_edges_per_triangle() {
        let geometry = Geometry::TriangleMesh(TriangleMesh::create_box(1.0, 1.0, 1.0));
        let binding = prepare(Technique::Wireframe, &geometry, &RenderOption::default(), &view_for(&geometry)).unwrap();
        assert_eq!(binding.vertices.len(), 12 * 6);
    }

    #[test]
    fn test_kind_mismatch() {
        let geometry = Geometry::Image(Image::new(2, 2, 1));
        let view = ViewControl::new();
        let mut option = RenderOption::default();
        option.point_color_option = PointColorOption::Color;
        assert!(matches!(
            prepare(Technique::SimplePoint, &geometry, &option, &view),
            Err(Error::UnsupportedGeometryKind { found: GeometryKind::Image, .. })
        ));
        assert!(prepare(Technique::Image, &geometry, &option, &view).is_ok());
    }
}

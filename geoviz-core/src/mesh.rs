//! Mesh data structures and functionality

use serde::{Deserialize, Serialize};

use crate::image::Image;
use crate::point::*;

/// A triangle mesh with optional shading attributes and a texture.
///
/// Per-vertex attributes hold one entry per vertex, `triangle_normals` one
/// per triangle and `triangle_uvs` three per triangle (one per corner).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub triangles: Vec<[u32; 3]>,
    pub vertex_normals: Vec<Vector3f>,
    pub vertex_colors: Vec<Color3f>,
    pub triangle_normals: Vec<Vector3f>,
    pub triangle_uvs: Vec<Vector2f>,
    pub texture: Option<Image>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and triangles
    pub fn from_vertices_and_triangles(vertices: Vec<Point3f>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
            ..Self::default()
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }

    pub fn has_vertex_normals(&self) -> bool {
        !self.vertices.is_empty() && self.vertex_normals.len() == self.vertices.len()
    }

    pub fn has_vertex_colors(&self) -> bool {
        !self.vertices.is_empty() && self.vertex_colors.len() == self.vertices.len()
    }

    pub fn has_triangle_normals(&self) -> bool {
        !self.triangles.is_empty() && self.triangle_normals.len() == self.triangles.len()
    }

    pub fn has_triangle_uvs(&self) -> bool {
        !self.triangles.is_empty() && self.triangle_uvs.len() == 3 * self.triangles.len()
    }

    pub fn has_texture(&self) -> bool {
        self.texture.as_ref().is_some_and(|texture| !texture.is_empty())
    }

    /// Corner positions of triangle `index`
    pub fn triangle_vertices(&self, index: usize) -> [Point3f; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Recompute one unit normal per triangle; degenerate triangles get a zero normal
    pub fn compute_triangle_normals(&mut self) {
        self.triangle_normals = (0..self.triangles.len())
            .map(|i| {
                let [v0, v1, v2] = self.triangle_vertices(i);
                (v1 - v0)
                    .cross(&(v2 - v0))
                    .try_normalize(f32::EPSILON)
                    .unwrap_or_else(Vector3f::zeros)
            })
            .collect();
    }

    /// Recompute vertex normals by averaging adjacent triangle normals
    pub fn compute_vertex_normals(&mut self) {
        if !self.has_triangle_normals() {
            self.compute_triangle_normals();
        }
        let mut normals = vec![Vector3f::zeros(); self.vertices.len()];
        for (triangle, normal) in self.triangles.iter().zip(&self.triangle_normals) {
            for &index in triangle {
                normals[index as usize] += normal;
            }
        }
        for normal in &mut normals {
            *normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::zeros);
        }
        self.vertex_normals = normals;
    }

    /// Paint every vertex with `color`
    pub fn paint_uniform_color(&mut self, color: Color3f) {
        self.vertex_colors = vec![color; self.vertices.len()];
    }

    /// Translate every vertex by `offset`
    pub fn translate(&mut self, offset: &Vector3f) {
        for vertex in &mut self.vertices {
            *vertex += offset;
        }
    }

    /// Append `other`, keeping an attribute only when both meshes carry it.
    ///
    /// The texture of `self` is kept; UVs are dropped unless both meshes have them.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let keep_vertex_normals = (self.has_vertex_normals() || self.is_empty()) && other.has_vertex_normals();
        let keep_vertex_colors = (self.has_vertex_colors() || self.is_empty()) && other.has_vertex_colors();
        let keep_triangle_normals =
            (self.has_triangle_normals() || self.is_empty()) && other.has_triangle_normals();
        let keep_uvs = self.has_triangle_uvs() && other.has_triangle_uvs();

        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );

        if keep_vertex_normals {
            self.vertex_normals.extend_from_slice(&other.vertex_normals);
        } else {
            self.vertex_normals.clear();
        }
        if keep_vertex_colors {
            self.vertex_colors.extend_from_slice(&other.vertex_colors);
        } else {
            self.vertex_colors.clear();
        }
        if keep_triangle_normals {
            self.triangle_normals.extend_from_slice(&other.triangle_normals);
        } else {
            self.triangle_normals.clear();
        }
        if keep_uvs {
            self.triangle_uvs.extend_from_slice(&other.triangle_uvs);
        } else {
            self.triangle_uvs.clear();
        }
    }

    /// Box spanning `(0, 0, 0)` to `(width, height, depth)`.
    ///
    /// Every face has its own four vertices so normals stay flat.
    pub fn create_box(width: f32, height: f32, depth: f32) -> Self {
        let corner = |x: f32, y: f32, z: f32| Point3f::new(x * width, y * height, z * depth);
        let faces: [[Point3f; 4]; 6] = [
            // -x
            [corner(0., 0., 0.), corner(0., 0., 1.), corner(0., 1., 1.), corner(0., 1., 0.)],
            // +x
            [corner(1., 0., 0.), corner(1., 1., 0.), corner(1., 1., 1.), corner(1., 0., 1.)],
            // -y
            [corner(0., 0., 0.), corner(1., 0., 0.), corner(1., 0., 1.), corner(0., 0., 1.)],
            // +y
            [corner(0., 1., 0.), corner(0., 1., 1.), corner(1., 1., 1.), corner(1., 1., 0.)],
            // -z
            [corner(0., 0., 0.), corner(0., 1., 0.), corner(1., 1., 0.), corner(1., 0., 0.)],
            // +z
            [corner(0., 0., 1.), corner(1., 0., 1.), corner(1., 1., 1.), corner(0., 1., 1.)],
        ];

        let mut mesh = TriangleMesh::new();
        for quad in faces {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend_from_slice(&quad);
            mesh.triangles.push([base, base + 1, base + 2]);
            mesh.triangles.push([base, base + 2, base + 3]);
        }
        mesh.compute_vertex_normals();
        mesh
    }

    /// Axis gizmo: red x, green y and blue z bars of length `size` meeting
    /// in a gray cube at `origin`.
    pub fn create_coordinate_frame(size: f32, origin: Point3f) -> Self {
        let thickness = size * 0.05;
        let half = thickness * 0.5;

        let mut frame = Self::create_box(thickness * 2.0, thickness * 2.0, thickness * 2.0);
        frame.translate(&Vector3f::new(-thickness, -thickness, -thickness));
        frame.paint_uniform_color(Color3f::new(0.5, 0.5, 0.5));

        let axes = [
            (Vector3f::new(size, thickness, thickness), Color3f::new(1.0, 0.0, 0.0)),
            (Vector3f::new(thickness, size, thickness), Color3f::new(0.0, 1.0, 0.0)),
            (Vector3f::new(thickness, thickness, size), Color3f::new(0.0, 0.0, 1.0)),
        ];
        for (extent, color) in axes {
            let mut bar = Self::create_box(extent.x, extent.y, extent.z);
            bar.translate(&Vector3f::new(-half, -half, -half));
            bar.paint_uniform_color(color);
            frame.merge(&bar);
        }

        frame.translate(&origin.coords);
        frame
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle() -> TriangleMesh {
        TriangleMesh::from_vertices_and_triangles(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_compute_normals() {
        let mut mesh = triangle();
        assert!(!mesh.has_triangle_normals());
        assert!(!mesh.has_vertex_normals());

        mesh.compute_vertex_normals();
        assert!(mesh.has_triangle_normals());
        assert!(mesh.has_vertex_normals());
        assert_relative_eq!(mesh.triangle_normals[0], Vector3f::z());
        for normal in &mesh.vertex_normals {
            assert_relative_eq!(*normal, Vector3f::z());
        }
    }

    #[test]
    fn test_texture_queries() {
        let mut mesh = triangle();
        mesh.triangle_uvs = vec![Vector2f::new(0.0, 0.0), Vector2f::new(1.0, 0.0), Vector2f::new(0.0, 1.0)];
        assert!(mesh.has_triangle_uvs());
        assert!(!mesh.has_texture());

        mesh.texture = Some(Image::new(2, 2, 3));
        assert!(mesh.has_texture());

        mesh.texture = Some(Image::default());
        assert!(!mesh.has_texture());
    }

    #[test]
    fn test_box_has_flat_normals() {
        let mesh = TriangleMesh::create_box(1.0, 2.0, 3.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.has_vertex_normals());
        for normal in &mesh.vertex_normals {
            assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(normal.abs().max(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_coordinate_frame() {
        let origin = Point3f::new(1.0, 2.0, 3.0);
        let frame = TriangleMesh::create_coordinate_frame(2.0, origin);

        assert_eq!(frame.triangle_count(), 48);
        assert!(frame.has_vertex_normals());
        assert!(frame.has_triangle_normals());
        assert!(frame.has_vertex_colors());

        let max_x = frame.vertices.iter().map(|v| v.x).fold(f32::MIN, f32::max);
        assert_relative_eq!(max_x, origin.x + 2.0 - 0.05, epsilon = 1e-5);
    }

    #[test]
    fn test_merge_drops_missing_attributes() {
        let mut a = triangle();
        a.compute_vertex_normals();
        let b = triangle();
        a.merge(&b);

        assert_eq!(a.vertex_count(), 6);
        assert_eq!(a.triangles[1], [3, 4, 5]);
        assert!(!a.has_vertex_normals());
    }
}

//! The geometry sum type and its shared handle

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::bounding_box::AxisAlignedBoundingBox;
use crate::image::Image;
use crate::mesh::TriangleMesh;
use crate::point_cloud::PointCloud;
use crate::traits::Drawable;

/// Discriminant of a [`Geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    PointCloud,
    TriangleMesh,
    Image,
    CoordinateFrameMesh,
    Unspecified,
}

/// Any geometry the visualizer knows how to draw.
///
/// `CoordinateFrameMesh` is a triangle mesh drawn as an axis gizmo, subject to
/// the coordinate frame display toggle. `Unspecified` stands for data the
/// renderers do not understand; it is always rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    PointCloud(PointCloud),
    TriangleMesh(TriangleMesh),
    Image(Image),
    CoordinateFrameMesh(TriangleMesh),
    Unspecified,
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::PointCloud(_) => GeometryKind::PointCloud,
            Geometry::TriangleMesh(_) => GeometryKind::TriangleMesh,
            Geometry::Image(_) => GeometryKind::Image,
            Geometry::CoordinateFrameMesh(_) => GeometryKind::CoordinateFrameMesh,
            Geometry::Unspecified => GeometryKind::Unspecified,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::PointCloud(cloud) => cloud.is_empty(),
            Geometry::TriangleMesh(mesh) | Geometry::CoordinateFrameMesh(mesh) => mesh.is_empty(),
            Geometry::Image(image) => image.is_empty(),
            Geometry::Unspecified => true,
        }
    }

    /// Point normals for clouds, vertex normals for meshes
    pub fn has_normals(&self) -> bool {
        match self {
            Geometry::PointCloud(cloud) => cloud.has_normals(),
            Geometry::TriangleMesh(mesh) | Geometry::CoordinateFrameMesh(mesh) => mesh.has_vertex_normals(),
            Geometry::Image(_) | Geometry::Unspecified => false,
        }
    }

    pub fn has_vertex_normals(&self) -> bool {
        self.as_mesh().is_some_and(TriangleMesh::has_vertex_normals)
    }

    pub fn has_triangle_normals(&self) -> bool {
        self.as_mesh().is_some_and(TriangleMesh::has_triangle_normals)
    }

    pub fn has_triangle_uvs(&self) -> bool {
        self.as_mesh().is_some_and(TriangleMesh::has_triangle_uvs)
    }

    pub fn has_texture(&self) -> bool {
        self.as_mesh().is_some_and(TriangleMesh::has_texture)
    }

    pub fn has_colors(&self) -> bool {
        match self {
            Geometry::PointCloud(cloud) => cloud.has_colors(),
            Geometry::TriangleMesh(mesh) | Geometry::CoordinateFrameMesh(mesh) => mesh.has_vertex_colors(),
            Geometry::Image(_) | Geometry::Unspecified => false,
        }
    }

    pub fn as_point_cloud(&self) -> Option<&PointCloud> {
        match self {
            Geometry::PointCloud(cloud) => Some(cloud),
            _ => None,
        }
    }

    /// The mesh behind either mesh kind
    pub fn as_mesh(&self) -> Option<&TriangleMesh> {
        match self {
            Geometry::TriangleMesh(mesh) | Geometry::CoordinateFrameMesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Geometry::Image(image) => Some(image),
            _ => None,
        }
    }
}

impl Drawable for Geometry {
    fn bounding_box(&self) -> AxisAlignedBoundingBox {
        match self {
            Geometry::PointCloud(cloud) => cloud.bounding_box(),
            Geometry::TriangleMesh(mesh) | Geometry::CoordinateFrameMesh(mesh) => mesh.bounding_box(),
            Geometry::Image(image) => image.bounding_box(),
            Geometry::Unspecified => AxisAlignedBoundingBox::empty(),
        }
    }
}

impl From<PointCloud> for Geometry {
    fn from(cloud: PointCloud) -> Self {
        Geometry::PointCloud(cloud)
    }
}

impl From<TriangleMesh> for Geometry {
    fn from(mesh: TriangleMesh) -> Self {
        Geometry::TriangleMesh(mesh)
    }
}

impl From<Image> for Geometry {
    fn from(image: Image) -> Self {
        Geometry::Image(image)
    }
}

/// Reference-counted handle to a geometry shared between the application and
/// the renderers drawing it.
///
/// Clones refer to the same geometry; [`SharedGeometry::ptr_eq`] compares
/// that identity, which survives replacing the contents through
/// [`SharedGeometry::borrow_mut`].
#[derive(Clone)]
pub struct SharedGeometry(Rc<RefCell<Geometry>>);

impl SharedGeometry {
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self(Rc::new(RefCell::new(geometry.into())))
    }

    /// Immutable access; panics if the application holds a mutable borrow
    pub fn borrow(&self) -> Ref<'_, Geometry> {
        self.0.borrow()
    }

    /// Immutable access that fails while a mutable borrow is alive
    pub fn try_borrow(&self) -> Option<Ref<'_, Geometry>> {
        self.0.try_borrow().ok()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Geometry> {
        self.0.borrow_mut()
    }

    /// Whether both handles refer to the same geometry
    pub fn ptr_eq(&self, other: &SharedGeometry) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Kind of the current contents
    pub fn kind(&self) -> GeometryKind {
        self.try_borrow()
            .map(|geometry| geometry.kind())
            .unwrap_or(GeometryKind::Unspecified)
    }

    pub fn bounding_box(&self) -> AxisAlignedBoundingBox {
        self.try_borrow()
            .map(|geometry| geometry.bounding_box())
            .unwrap_or_default()
    }
}

impl fmt::Debug for SharedGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedGeometry")
            .field("ptr", &Rc::as_ptr(&self.0))
            .field("kind", &self.kind())
            .finish()
    }
}

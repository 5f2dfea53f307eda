//! Core traits for geoviz

use crate::{bounding_box::AxisAlignedBoundingBox, image::Image, mesh::TriangleMesh, point::*, point_cloud::PointCloud};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> AxisAlignedBoundingBox;

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        self.bounding_box().center()
    }
}

impl Drawable for PointCloud {
    fn bounding_box(&self) -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::from_points(&self.points)
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::from_points(&self.vertices)
    }
}

/// Images occupy the rectangle `(0, 0, 0)` to `(width, height, 0)`
impl Drawable for Image {
    fn bounding_box(&self) -> AxisAlignedBoundingBox {
        if self.is_empty() {
            return AxisAlignedBoundingBox::empty();
        }
        AxisAlignedBoundingBox::new(
            Point3f::origin(),
            Point3f::new(self.width as f32, self.height as f32, 0.0),
        )
    }
}

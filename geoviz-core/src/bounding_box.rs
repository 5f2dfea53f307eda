//! Axis-aligned bounding boxes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::point::Point3f;

/// An axis-aligned bounding box.
///
/// The empty box has `min_bound > max_bound` on every axis, so merging any
/// point or box into it yields that point or box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAlignedBoundingBox {
    pub min_bound: Point3f,
    pub max_bound: Point3f,
}

impl AxisAlignedBoundingBox {
    /// Create the empty bounding box
    pub fn empty() -> Self {
        Self {
            min_bound: Point3f::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max_bound: Point3f::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Create a bounding box from explicit bounds
    pub fn new(min_bound: Point3f, max_bound: Point3f) -> Self {
        Self { min_bound, max_bound }
    }

    /// Smallest box containing all given points
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut bbox = Self::empty();
        for point in points {
            bbox.add_point(point);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min_bound.x > self.max_bound.x
            || self.min_bound.y > self.max_bound.y
            || self.min_bound.z > self.max_bound.z
    }

    /// Grow the box to contain `point`
    pub fn add_point(&mut self, point: &Point3f) {
        self.min_bound = self.min_bound.inf(point);
        self.max_bound = self.max_bound.sup(point);
    }

    /// Grow the box to contain `other`
    pub fn merge(&mut self, other: &AxisAlignedBoundingBox) {
        if other.is_empty() {
            return;
        }
        self.min_bound = self.min_bound.inf(&other.min_bound);
        self.max_bound = self.max_bound.sup(&other.max_bound);
    }

    /// Largest side length, zero for the empty box
    pub fn max_extent(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max_bound - self.min_bound).max()
    }

    pub fn center(&self) -> Point3f {
        if self.is_empty() {
            return Point3f::origin();
        }
        nalgebra::center(&self.min_bound, &self.max_bound)
    }

    /// Relative position of `value` along `axis` (0 = x, 1 = y, 2 = z).
    ///
    /// Returns 0.5 when the box is flat along that axis.
    pub fn percentage(&self, axis: usize, value: f32) -> f32 {
        if self.is_empty() {
            return 0.5;
        }
        let range = self.max_bound[axis] - self.min_bound[axis];
        if range <= f32::EPSILON {
            return 0.5;
        }
        ((value - self.min_bound[axis]) / range).clamp(0.0, 1.0)
    }
}

impl Default for AxisAlignedBoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for AxisAlignedBoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[empty]");
        }
        write!(
            f,
            "[({:.4}, {:.4}, {:.4}) - ({:.4}, {:.4}, {:.4})]",
            self.min_bound.x,
            self.min_bound.y,
            self.min_bound.z,
            self.max_bound.x,
            self.max_bound.y,
            self.max_bound.z
        )
    }
}

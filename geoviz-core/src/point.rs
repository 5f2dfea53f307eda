//! Point and vector aliases

use nalgebra::{Point3, Vector2, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 2D vector, used for texture coordinates
pub type Vector2f = Vector2<f32>;

/// Linear RGB color with components in `[0, 1]`
pub type Color3f = Vector3<f32>;

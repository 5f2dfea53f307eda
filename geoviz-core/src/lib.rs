//! Core data structures and traits for geoviz
//!
//! This crate provides the geometry containers the renderers consume: point
//! clouds, triangle meshes, images, the [`Geometry`] sum type over them and
//! the [`SharedGeometry`] handle the visualizer tracks by identity.

pub mod bounding_box;
pub mod error;
pub mod geometry;
pub mod image;
pub mod mesh;
pub mod point;
pub mod point_cloud;
pub mod traits;

pub use bounding_box::*;
pub use error::*;
pub use geometry::*;
pub use crate::image::*;
pub use mesh::*;
pub use point::*;
pub use point_cloud::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};

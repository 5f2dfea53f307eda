//! Point cloud data structures and functionality

use serde::{Deserialize, Serialize};

use crate::point::*;

/// A point cloud with optional per-point normals and colors.
///
/// `normals` and `colors` are either empty or hold one entry per point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point3f>,
    pub normals: Vec<Vector3f>,
    pub colors: Vec<Color3f>,
}

impl PointCloud {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<Point3f>) -> Self {
        Self {
            points,
            normals: Vec::new(),
            colors: Vec::new(),
        }
    }

    /// Attach normals; ignored unless there is one normal per point
    pub fn with_normals(mut self, normals: Vec<Vector3f>) -> Self {
        self.set_normals(normals);
        self
    }

    /// Attach colors; ignored unless there is one color per point
    pub fn with_colors(mut self, colors: Vec<Color3f>) -> Self {
        self.set_colors(colors);
        self
    }

    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.points.len() {
            self.normals = normals;
        }
    }

    pub fn set_colors(&mut self, colors: Vec<Color3f>) {
        if colors.len() == self.points.len() {
            self.colors = colors;
        }
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.points.is_empty() && self.normals.len() == self.points.len()
    }

    pub fn has_colors(&self) -> bool {
        !self.points.is_empty() && self.colors.len() == self.points.len()
    }

    /// Translate every point by `offset`
    pub fn translate(&mut self, offset: &Vector3f) {
        for point in &mut self.points {
            *point += offset;
        }
    }

    /// Drop normals
    pub fn clear_normals(&mut self) {
        self.normals.clear();
    }

    /// Clear all points and attributes from the cloud
    pub fn clear(&mut self) {
        self.points.clear();
        self.normals.clear();
        self.colors.clear();
    }
}

impl FromIterator<Point3f> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point3f>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_require_matching_length() {
        let cloud = PointCloud::from_points(vec![Point3f::origin(), Point3f::new(1.0, 0.0, 0.0)])
            .with_normals(vec![Vector3f::z()])
            .with_colors(vec![Color3f::new(1.0, 0.0, 0.0); 2]);

        assert!(!cloud.has_normals());
        assert!(cloud.has_colors());
    }

    #[test]
    fn test_empty_cloud_has_no_attributes() {
        let cloud = PointCloud::new();
        assert!(cloud.is_empty());
        assert!(!cloud.has_normals());
        assert!(!cloud.has_colors());
    }
}

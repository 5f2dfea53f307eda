//! Camera state fitted to the scene bounding box

use std::f32::consts::PI;

use geoviz_core::AxisAlignedBoundingBox;
use nalgebra::{Matrix4, Vector3};

use crate::gl_helper;

pub const FIELD_OF_VIEW_MAX: f32 = 90.0;
pub const FIELD_OF_VIEW_MIN: f32 = 5.0;
pub const FIELD_OF_VIEW_DEFAULT: f32 = 60.0;
pub const FIELD_OF_VIEW_STEP: f32 = 5.0;

pub const ZOOM_DEFAULT: f32 = 0.7;
pub const ZOOM_MIN: f32 = 0.02;
pub const ZOOM_MAX: f32 = 2.0;
pub const ZOOM_STEP: f32 = 0.02;

pub const ROTATION_RADIAN_PER_PIXEL: f32 = 0.003;

/// Perspective above the minimum field of view, orthographic at it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Perspective,
    Orthogonal,
}

/// Orbit camera around the scene bounding box.
///
/// The camera sits at `lookat + front * distance`, where the distance is
/// chosen so that `zoom * max_extent` fills the vertical field of view.
#[derive(Debug, Clone)]
pub struct ViewControl {
    bounding_box: AxisAlignedBoundingBox,
    field_of_view: f32,
    zoom: f32,
    lookat: Vector3<f32>,
    up: Vector3<f32>,
    front: Vector3<f32>,
    right: Vector3<f32>,
    eye: Vector3<f32>,
    distance: f32,
    view_ratio: f32,
    aspect: f32,
    z_near: f32,
    z_far: f32,
    window_width: u32,
    window_height: u32,
    projection_matrix: Matrix4<f32>,
    view_matrix: Matrix4<f32>,
    model_matrix: Matrix4<f32>,
    mvp_matrix: Matrix4<f32>,
}

impl Default for ViewControl {
    fn default() -> Self {
        let mut view = Self {
            bounding_box: AxisAlignedBoundingBox::empty(),
            field_of_view: FIELD_OF_VIEW_DEFAULT,
            zoom: ZOOM_DEFAULT,
            lookat: Vector3::zeros(),
            up: Vector3::y(),
            front: Vector3::z(),
            right: Vector3::x(),
            eye: Vector3::zeros(),
            distance: 0.0,
            view_ratio: 0.0,
            aspect: 1.0,
            z_near: 0.0,
            z_far: 0.0,
            window_width: 0,
            window_height: 0,
            projection_matrix: Matrix4::identity(),
            view_matrix: Matrix4::identity(),
            model_matrix: Matrix4::identity(),
            mvp_matrix: Matrix4::identity(),
        };
        view.reset();
        view
    }
}

impl ViewControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the matrices for the current camera and window size
    pub fn set_view_matrices(&mut self, model_matrix: Matrix4<f32>) {
        if self.window_width == 0 || self.window_height == 0 {
            log::warn!("ViewControl::set_view_matrices: window height or width is 0");
            return;
        }
        let extent = self.scene_extent();
        self.projection_matrix = match self.projection_type() {
            ProjectionType::Perspective => {
                self.z_near = (0.01 * extent).max(self.distance - 3.0 * extent);
                self.z_far = self.distance + 3.0 * extent;
                gl_helper::perspective(self.field_of_view, self.aspect, self.z_near, self.z_far)
            }
            ProjectionType::Orthogonal => {
                self.z_near = self.distance - 3.0 * extent;
                self.z_far = self.distance + 3.0 * extent;
                gl_helper::ortho(
                    -self.aspect * self.view_ratio,
                    self.aspect * self.view_ratio,
                    -self.view_ratio,
                    self.view_ratio,
                    self.z_near,
                    self.z_far,
                )
            }
        };
        self.view_matrix = gl_helper::look_at(&self.eye, &self.lookat, &self.up);
        self.model_matrix = model_matrix;
        self.mvp_matrix = self.projection_matrix * self.view_matrix * self.model_matrix;
    }

    /// Grow the tracked bounding box to contain `bounds`
    pub fn fit_in_geometry(&mut self, bounds: &AxisAlignedBoundingBox) {
        self.bounding_box.merge(bounds);
        self.set_projection_parameters();
    }

    pub fn reset_bounding_box(&mut self) {
        self.bounding_box = AxisAlignedBoundingBox::empty();
    }

    /// Look at the bounding box center from +z with y up and default zoom
    pub fn reset(&mut self) {
        self.field_of_view = FIELD_OF_VIEW_DEFAULT;
        self.zoom = ZOOM_DEFAULT;
        self.lookat = self.bounding_box.center().coords;
        self.up = Vector3::y();
        self.front = Vector3::z();
        self.set_projection_parameters();
    }

    /// Change the field of view by `steps` increments of [`FIELD_OF_VIEW_STEP`]
    pub fn change_field_of_view(&mut self, steps: f32) {
        self.field_of_view = (self.field_of_view + steps * FIELD_OF_VIEW_STEP)
            .clamp(FIELD_OF_VIEW_MIN, FIELD_OF_VIEW_MAX);
        self.set_projection_parameters();
    }

    pub fn change_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Zoom by `scale` increments of [`ZOOM_STEP`]
    pub fn scale(&mut self, scale: f32) {
        self.zoom = (self.zoom + scale * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
        self.set_projection_parameters();
    }

    /// Orbit around the look-at point by a mouse drag of `(x, y)` pixels
    pub fn rotate(&mut self, x: f32, y: f32) {
        let alpha = x * ROTATION_RADIAN_PER_PIXEL;
        let beta = y * ROTATION_RADIAN_PER_PIXEL;
        self.front = self.front * alpha.cos() - self.right * alpha.sin();
        self.right = self.up.cross(&self.front).normalize();
        self.front = self.front * beta.cos() + self.up * beta.sin();
        self.up = self.front.cross(&self.right).normalize();
        self.set_projection_parameters();
    }

    /// Pan the camera and look-at point by a mouse drag of `(x, y)` pixels
    pub fn translate(&mut self, x: f32, y: f32) {
        if self.window_height == 0 {
            return;
        }
        let pixel = self.view_ratio * 2.0 / self.window_height as f32;
        let shift = self.right * (-x) * pixel + self.up * y * pixel;
        self.lookat += shift;
        self.set_projection_parameters();
    }

    pub fn projection_type(&self) -> ProjectionType {
        if self.field_of_view > FIELD_OF_VIEW_MIN + f32::EPSILON {
            ProjectionType::Perspective
        } else {
            ProjectionType::Orthogonal
        }
    }

    pub fn bounding_box(&self) -> &AxisAlignedBoundingBox {
        &self.bounding_box
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn lookat(&self) -> &Vector3<f32> {
        &self.lookat
    }

    pub fn front(&self) -> &Vector3<f32> {
        &self.front
    }

    pub fn up(&self) -> &Vector3<f32> {
        &self.up
    }

    pub fn eye(&self) -> &Vector3<f32> {
        &self.eye
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn z_near(&self) -> f32 {
        self.z_near
    }

    pub fn z_far(&self) -> f32 {
        self.z_far
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection_matrix
    }

    pub fn view_matrix(&self) -> &Matrix4<f32> {
        &self.view_matrix
    }

    pub fn model_matrix(&self) -> &Matrix4<f32> {
        &self.model_matrix
    }

    pub fn mvp_matrix(&self) -> &Matrix4<f32> {
        &self.mvp_matrix
    }

    // An empty or flat scene still gets a usable camera
    fn scene_extent(&self) -> f32 {
        let extent = self.bounding_box.max_extent();
        if extent > 0.0 {
            extent
        } else {
            1.0
        }
    }

    fn set_projection_parameters(&mut self) {
        let extent = self.scene_extent();
        self.front = self.front.normalize();
        self.right = self.up.cross(&self.front).normalize();
        self.view_ratio = self.zoom * extent;
        let half_fov = match self.projection_type() {
            ProjectionType::Perspective => self.field_of_view * 0.5 / 180.0 * PI,
            ProjectionType::Orthogonal => FIELD_OF_VIEW_STEP * 0.5 / 180.0 * PI,
        };
        self.distance = self.view_ratio / half_fov.tan();
        self.eye = self.lookat + self.front * self.distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geoviz_core::Point3f;

    fn unit_box() -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::new(Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_reset_frames_bounding_box() {
        let mut view = ViewControl::new();
        view.fit_in_geometry(&unit_box());
        view.reset();

        assert_relative_eq!(*view.lookat(), Vector3::zeros());
        assert_relative_eq!(view.zoom(), ZOOM_DEFAULT);
        // view_ratio = 0.7 * 2, distance = view_ratio / tan(30 deg)
        let expected = 1.4 / (30.0f32).to_radians().tan();
        assert_relative_eq!(view.distance(), expected, epsilon = 1e-5);
        assert_relative_eq!(*view.eye(), Vector3::new(0.0, 0.0, expected), epsilon = 1e-5);
    }

    #[test]
    fn test_fit_merges_bounds() {
        let mut view = ViewControl::new();
        view.fit_in_geometry(&unit_box());
        view.fit_in_geometry(&AxisAlignedBoundingBox::new(
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(3.0, 1.0, 1.0),
        ));
        assert_eq!(view.bounding_box().max_bound, Point3f::new(3.0, 1.0, 1.0));
        assert_relative_eq!(view.bounding_box().max_extent(), 4.0);

        view.reset_bounding_box();
        assert!(view.bounding_box().is_empty());
    }

    #[test]
    fn test_zoom_and_field_of_view_clamp() {
        let mut view = ViewControl::new();
        view.scale(1000.0);
        assert_relative_eq!(view.zoom(), ZOOM_MAX);
        view.scale(-1000.0);
        assert_relative_eq!(view.zoom(), ZOOM_MIN);

        view.change_field_of_view(100.0);
        assert_relative_eq!(view.field_of_view(), FIELD_OF_VIEW_MAX);
        view.change_field_of_view(-100.0);
        assert_relative_eq!(view.field_of_view(), FIELD_OF_VIEW_MIN);
        assert_eq!(view.projection_type(), ProjectionType::Orthogonal);
    }

    #[test]
    fn test_translate_keeps_viewing_direction() {
        let mut view = ViewControl::new();
        view.fit_in_geometry(&unit_box());
        view.change_window_size(640, 480);
        view.reset();
        let offset = view.eye() - view.lookat();

        view.translate(-100.0, 50.0);
        assert!(view.lookat().x > 0.0);
        assert!(view.lookat().y > 0.0);
        assert_relative_eq!(view.eye() - view.lookat(), offset, epsilon = 1e-5);
    }

    #[test]
    fn test_rotate_keeps_distance() {
        let mut view = ViewControl::new();
        view.fit_in_geometry(&unit_box());
        view.reset();
        let distance = view.distance();

        view.rotate(200.0, -80.0);
        assert_relative_eq!((view.eye() - view.lookat()).norm(), distance, epsilon = 1e-4);
        assert_relative_eq!(view.front().dot(view.up()), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_mvp_puts_center_in_view() {
        let mut view = ViewControl::new();
        view.fit_in_geometry(&unit_box());
        view.change_window_size(800, 600);
        view.reset();
        view.set_view_matrices(Matrix4::identity());

        let screen = gl_helper::project(&Vector3::zeros(), view.mvp_matrix(), 800, 600);
        assert_relative_eq!(screen.x, 400.0, epsilon = 1e-3);
        assert_relative_eq!(screen.y, 300.0, epsilon = 1e-3);
        assert!(screen.z > 0.0 && screen.z < 1.0);
    }
}

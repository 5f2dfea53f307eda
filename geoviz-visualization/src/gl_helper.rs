//! Camera and projection matrices in OpenGL conventions.
//!
//! Matrices map into a clip space with z in [-1, 1]; use
//! [`OPENGL_TO_WGPU_MATRIX`] before handing them to a wgpu program.

use nalgebra::{Matrix4, Vector3, Vector4};

/// Remaps OpenGL clip-space depth [-1, 1] to the [0, 1] range wgpu expects
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// View matrix of a camera at `eye` looking towards `lookat`
pub fn look_at(eye: &Vector3<f32>, lookat: &Vector3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
    let front = (eye - lookat).normalize();
    let right = up.normalize().cross(&front).normalize();
    let up = front.cross(&right).normalize();

    #[rustfmt::skip]
    let view = Matrix4::new(
        right.x, right.y, right.z, -right.dot(eye),
        up.x,    up.y,    up.z,    -up.dot(eye),
        front.x, front.y, front.z, -front.dot(eye),
        0.0,     0.0,     0.0,     1.0,
    );
    view
}

/// Perspective projection; `field_of_view` is the vertical angle in degrees
pub fn perspective(field_of_view: f32, aspect: f32, z_near: f32, z_far: f32) -> Matrix4<f32> {
    let tan_half_fov = (field_of_view.to_radians() / 2.0).tan();
    let mut projection = Matrix4::zeros();
    projection[(0, 0)] = 1.0 / aspect / tan_half_fov;
    projection[(1, 1)] = 1.0 / tan_half_fov;
    projection[(2, 2)] = -(z_far + z_near) / (z_far - z_near);
    projection[(3, 2)] = -1.0;
    projection[(2, 3)] = -2.0 * z_far * z_near / (z_far - z_near);
    projection
}

pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, z_near: f32, z_far: f32) -> Matrix4<f32> {
    let mut projection = Matrix4::identity();
    projection[(0, 0)] = 2.0 / (right - left);
    projection[(1, 1)] = 2.0 / (top - bottom);
    projection[(2, 2)] = -2.0 / (z_far - z_near);
    projection[(0, 3)] = -(right + left) / (right - left);
    projection[(1, 3)] = -(top + bottom) / (top - bottom);
    projection[(2, 3)] = -(z_far + z_near) / (z_far - z_near);
    projection
}

/// Window coordinates of `point`: x and y in pixels from the bottom left,
/// z the depth in [0, 1]
pub fn project(point: &Vector3<f32>, mvp: &Matrix4<f32>, width: u32, height: u32) -> Vector3<f32> {
    let clip = mvp * point.push(1.0);
    if clip.w == 0.0 {
        return Vector3::zeros();
    }
    let ndc = clip / clip.w;
    Vector3::new(
        (ndc.x * 0.5 + 0.5) * width as f32,
        (ndc.y * 0.5 + 0.5) * height as f32,
        ndc.z * 0.5 + 0.5,
    )
}

/// Inverse of [`project`]; `None` when `mvp` is singular
pub fn unproject(
    screen_point: &Vector3<f32>,
    mvp: &Matrix4<f32>,
    width: u32,
    height: u32,
) -> Option<Vector3<f32>> {
    let ndc = Vector4::new(
        screen_point.x / width as f32 * 2.0 - 1.0,
        screen_point.y / height as f32 * 2.0 - 1.0,
        screen_point.z * 2.0 - 1.0,
        1.0,
    );
    let world = mvp.try_inverse()? * ndc;
    if world.w == 0.0 {
        return None;
    }
    Some(world.xyz() / world.w)
}

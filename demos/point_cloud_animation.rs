//! Point Cloud Animation Example
//!
//! Shows a noisy sphere with normals spinning about the y axis. The
//! animation callback rotates the points in place and reports the change,
//! so the visualizer rebinds and redraws every iteration.
//!
//! Try `N` for normals, `9` for normal coloring and `2`..`4` for
//! coordinate color maps.

use std::f32::consts::PI;

use anyhow::Result;
use geoviz_core::{Geometry, Point3f, PointCloud, SharedGeometry, Vector3f};
use geoviz_visualization::{
    draw_geometries_with_animation_callback, init_logging, LoggingConfig, Visualizer, WindowConfig,
};
use nalgebra::{Rotation3, Vector3};
use rand::Rng;

fn noisy_sphere(count: usize, radius: f32) -> PointCloud {
    let mut rng = rand::thread_rng();
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    let (points, normals): (Vec<_>, Vec<_>) = (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let ring = (1.0 - y * y).sqrt();
            let theta = golden_angle * i as f32;
            let normal = Vector3f::new(ring * theta.cos(), y, ring * theta.sin());
            let jitter = rng.gen_range(-0.02..0.02);
            (Point3f::from(normal * (radius + jitter)), normal)
        })
        .unzip();
    PointCloud::from_points(points).with_normals(normals)
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let cloud = SharedGeometry::new(noisy_sphere(4000, 1.0));
    let spinning = cloud.clone();
    let step = Rotation3::from_axis_angle(&Vector3::y_axis(), 0.01);

    let config = WindowConfig {
        title: "geoviz point cloud animation".to_string(),
        width: 1024,
        height: 768,
        ..WindowConfig::default()
    };
    draw_geometries_with_animation_callback(
        &[cloud],
        &config,
        Box::new(move |_: &mut Visualizer| {
            if let Geometry::PointCloud(points) = &mut *spinning.borrow_mut() {
                for point in &mut points.points {
                    *point = step * *point;
                }
                for normal in &mut points.normals {
                    *normal = step * *normal;
                }
            }
            true
        }),
    )?;
    Ok(())
}

//! Mesh Viewer Example
//!
//! Opens a window with a checker-textured box next to a plain smooth-shaded
//! one, driving the [`Visualizer`] directly instead of through
//! `draw_geometries`. Render options can be loaded from a JSON file given
//! as the first argument.
//!
//! Keys: `W` wireframe, `S` flat/smooth shading, `L` lighting, `F` axes,
//! `Ctrl+0..4,9` mesh color option, `H` for the full list.

use anyhow::{Context, Result};
use geoviz_core::{Image, SharedGeometry, TriangleMesh, Vector2f, Vector3f};
use geoviz_visualization::{init_logging, LoggingConfig, RenderOption, Visualizer, WindowConfig, WinitWindowSystem};

fn checker(size: u32, cells: u32) -> Image {
    let cell = (size / cells).max(1);
    let data = (0..size * size)
        .flat_map(|i| {
            let (x, y) = (i % size / cell, i / size / cell);
            if (x + y) % 2 == 0 {
                [230, 230, 230]
            } else {
                [40, 90, 160]
            }
        })
        .collect();
    Image {
        width: size,
        height: size,
        num_channels: 3,
        data,
    }
}

fn textured_box() -> TriangleMesh {
    let mut mesh = TriangleMesh::create_box(1.0, 1.0, 1.0);
    // Each face is two triangles over its own quad: (0, 1, 2) and (0, 2, 3)
    let quad = [
        Vector2f::new(0.0, 0.0),
        Vector2f::new(1.0, 0.0),
        Vector2f::new(1.0, 1.0),
        Vector2f::new(0.0, 0.0),
        Vector2f::new(1.0, 1.0),
        Vector2f::new(0.0, 1.0),
    ];
    mesh.triangle_uvs = quad.iter().copied().cycle().take(mesh.triangles.len() * 3).collect();
    mesh.texture = Some(checker(256, 8));
    mesh
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut plain = TriangleMesh::create_box(0.6, 1.5, 0.6);
    plain.translate(&Vector3f::new(1.5, 0.0, 0.2));
    plain.paint_uniform_color(Vector3f::new(0.9, 0.5, 0.2));

    let mut windowing = WinitWindowSystem::new()?;
    let mut visualizer = Visualizer::new();
    visualizer.create_window(
        &mut windowing,
        &WindowConfig {
            title: "geoviz mesh viewer".to_string(),
            ..WindowConfig::default()
        },
    )?;

    if let Some(path) = std::env::args().nth(1) {
        let option = RenderOption::load_from_json(&path).with_context(|| format!("reading {path}"))?;
        *visualizer.render_option_mut() = option;
    } else {
        visualizer.render_option_mut().show_coordinate_frame = true;
    }

    visualizer.add_geometry(SharedGeometry::new(textured_box()), true)?;
    visualizer.add_geometry(SharedGeometry::new(plain), true)?;
    visualizer.print_help();
    visualizer.run(&mut windowing)?;

    log::info!("{} geometries shown", visualizer.geometry_count());
    visualizer.destroy_window(&mut windowing);
    Ok(())
}

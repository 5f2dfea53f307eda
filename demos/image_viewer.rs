//! Image Viewer Example
//!
//! Displays an image file (first argument) or a generated gradient. `T`
//! cycles the stretch mode and `I` switches between linear and nearest
//! sampling.

use anyhow::{Context, Result};
use geoviz_core::{Image, SharedGeometry};
use geoviz_visualization::{draw_geometries, init_logging, LoggingConfig, WindowConfig};

fn gradient(width: u32, height: u32) -> Image {
    let buffer = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    Image::from_dynamic_image(&image::DynamicImage::ImageRgb8(buffer))
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let picture = match std::env::args().nth(1) {
        Some(path) => {
            let decoded = image::open(&path).with_context(|| format!("decoding {path}"))?;
            Image::from_dynamic_image(&decoded)
        }
        None => gradient(320, 200),
    };
    log::info!("showing {}x{} image", picture.width, picture.height);

    draw_geometries(
        &[SharedGeometry::new(picture)],
        &WindowConfig {
            title: "geoviz image viewer".to_string(),
            ..WindowConfig::default()
        },
    )?;
    Ok(())
}

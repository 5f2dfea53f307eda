//! WGSL sources for the built-in programs.
//!
//! Each program is the shared prelude (uniform block, point quad expansion
//! and headlight shading) followed by its own vertex and fragment stages.

macro_rules! program_source {
    ($file:literal) => {
        concat!(
            include_str!("shaders/common.wgsl"),
            "\n",
            include_str!(concat!("shaders/", $file))
        )
    };
}

/// Unlit colored lines and triangles
pub const SIMPLE_SHADER: &str = program_source!("simple.wgsl");

/// Unlit colored points
pub const SIMPLE_POINT_SHADER: &str = program_source!("simple_point.wgsl");

/// Lit points with per-point normals
pub const PHONG_POINT_SHADER: &str = program_source!("phong_point.wgsl");

/// Lit triangles with per-vertex normals
pub const PHONG_SHADER: &str = program_source!("phong.wgsl");

/// Unlit textured triangles
pub const TEXTURE_SIMPLE_SHADER: &str = program_source!("texture_simple.wgsl");

/// Lit textured triangles
pub const TEXTURE_PHONG_SHADER: &str = program_source!("texture_phong.wgsl");

/// Screen-space image quad
pub const IMAGE_SHADER: &str = program_source!("image.wgsl");

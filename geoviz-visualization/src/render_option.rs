//! Display options consumed by the renderers each frame

use std::fs;
use std::path::Path;

use geoviz_core::{Color3f, Result};
use serde::{Deserialize, Serialize};

use crate::color_map::ColorMapOption;

pub const POINT_SIZE_MAX: f32 = 25.0;
pub const POINT_SIZE_MIN: f32 = 1.0;
pub const POINT_SIZE_STEP: f32 = 1.0;
pub const POINT_SIZE_DEFAULT: f32 = 5.0;
pub const LINE_WIDTH_MAX: f32 = 10.0;
pub const LINE_WIDTH_MIN: f32 = 1.0;
pub const LINE_WIDTH_STEP: f32 = 1.0;
pub const LINE_WIDTH_DEFAULT: f32 = 1.0;

/// How point clouds are colored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointColorOption {
    #[default]
    Default,
    Color,
    XCoordinate,
    YCoordinate,
    ZCoordinate,
    Normal,
}

/// How triangle meshes are colored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeshColorOption {
    Default,
    #[default]
    Color,
    XCoordinate,
    YCoordinate,
    ZCoordinate,
    Normal,
}

/// Per-triangle or per-vertex normals for lit meshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeshShadeOption {
    #[default]
    FlatShade,
    SmoothShade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageStretchOption {
    /// One image pixel per window pixel
    OriginalSize,
    #[default]
    StretchKeepRatio,
    StretchWithWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureInterpolationOption {
    Nearest,
    #[default]
    Linear,
}

/// Which color to derive from a coordinate or normal, shared by the point
/// and mesh color options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSource {
    /// Stored per-element colors when present
    Stored,
    Axis(usize),
    Normal,
    Uniform,
}

macro_rules! digit_options {
    ($option:ident) => {
        impl $option {
            /// Option selected by a digit key
            pub fn from_digit(digit: u32) -> Option<Self> {
                match digit {
                    0 => Some($option::Default),
                    1 => Some($option::Color),
                    2 => Some($option::XCoordinate),
                    3 => Some($option::YCoordinate),
                    4 => Some($option::ZCoordinate),
                    9 => Some($option::Normal),
                    _ => None,
                }
            }
        }
    };
}

digit_options!(PointColorOption);
digit_options!(MeshColorOption);

/// Display configuration of a visualizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOption {
    pub background_color: [f32; 4],
    pub point_size: f32,
    pub line_width: f32,
    pub point_color_option: PointColorOption,
    pub point_show_normal: bool,
    pub mesh_color_option: MeshColorOption,
    pub mesh_shade_option: MeshShadeOption,
    pub mesh_show_wireframe: bool,
    pub default_mesh_color: [f32; 3],
    pub show_coordinate_frame: bool,
    pub light_on: bool,
    pub light_color: [f32; 3],
    pub image_stretch_option: ImageStretchOption,
    pub interpolation_option: TextureInterpolationOption,
    pub color_map: ColorMapOption,
}

impl Default for RenderOption {
    fn default() -> Self {
        Self {
            background_color: [0.1, 0.1, 0.1, 1.0],
            point_size: POINT_SIZE_DEFAULT,
            line_width: LINE_WIDTH_DEFAULT,
            point_color_option: PointColorOption::default(),
            point_show_normal: false,
            mesh_color_option: MeshColorOption::default(),
            mesh_shade_option: MeshShadeOption::default(),
            mesh_show_wireframe: false,
            default_mesh_color: [0.7, 0.7, 0.7],
            show_coordinate_frame: false,
            light_on: true,
            light_color: [1.0, 1.0, 1.0],
            image_stretch_option: ImageStretchOption::default(),
            interpolation_option: TextureInterpolationOption::default(),
            color_map: ColorMapOption::default(),
        }
    }
}

impl RenderOption {
    /// Load options from a JSON file; missing fields keep their defaults
    pub fn load_from_json(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Change the point size by `steps` increments, clamped to its range
    pub fn change_point_size(&mut self, steps: f32) {
        self.point_size =
            (self.point_size + steps * POINT_SIZE_STEP).clamp(POINT_SIZE_MIN, POINT_SIZE_MAX);
    }

    pub fn change_line_width(&mut self, steps: f32) {
        self.line_width =
            (self.line_width + steps * LINE_WIDTH_STEP).clamp(LINE_WIDTH_MIN, LINE_WIDTH_MAX);
    }

    pub fn toggle_point_show_normal(&mut self) {
        self.point_show_normal = !self.point_show_normal;
    }

    pub fn toggle_mesh_show_wireframe(&mut self) {
        self.mesh_show_wireframe = !self.mesh_show_wireframe;
    }

    pub fn toggle_show_coordinate_frame(&mut self) {
        self.show_coordinate_frame = !self.show_coordinate_frame;
    }

    pub fn toggle_light_on(&mut self) {
        self.light_on = !self.light_on;
    }

    pub fn toggle_shading_option(&mut self) {
        self.mesh_shade_option = match self.mesh_shade_option {
            MeshShadeOption::FlatShade => MeshShadeOption::SmoothShade,
            MeshShadeOption::SmoothShade => MeshShadeOption::FlatShade,
        };
    }

    pub fn toggle_interpolation_option(&mut self) {
        self.interpolation_option = match self.interpolation_option {
            TextureInterpolationOption::Nearest => TextureInterpolationOption::Linear,
            TextureInterpolationOption::Linear => TextureInterpolationOption::Nearest,
        };
    }

    /// Cycle original size, keep ratio, stretch with window
    pub fn toggle_image_stretch_option(&mut self) {
        self.image_stretch_option = match self.image_stretch_option {
            ImageStretchOption::OriginalSize => ImageStretchOption::StretchKeepRatio,
            ImageStretchOption::StretchKeepRatio => ImageStretchOption::StretchWithWindow,
            ImageStretchOption::StretchWithWindow => ImageStretchOption::OriginalSize,
        };
    }

    pub fn default_mesh_color(&self) -> Color3f {
        Color3f::from(self.default_mesh_color)
    }

    /// Color source for point clouds under the current option
    pub fn point_color_source(&self) -> ColorSource {
        match self.point_color_option {
            PointColorOption::Default | PointColorOption::Color => ColorSource::Stored,
            PointColorOption::XCoordinate => ColorSource::Axis(0),
            PointColorOption::YCoordinate => ColorSource::Axis(1),
            PointColorOption::ZCoordinate => ColorSource::Axis(2),
            PointColorOption::Normal => ColorSource::Normal,
        }
    }

    /// Color source for triangle meshes under the current option
    pub fn mesh_color_source(&self) -> ColorSource {
        match self.mesh_color_option {
            MeshColorOption::Default => ColorSource::Uniform,
            MeshColorOption::Color => ColorSource::Stored,
            MeshColorOption::XCoordinate => ColorSource::Axis(0),
            MeshColorOption::YCoordinate => ColorSource::Axis(1),
            MeshColorOption::ZCoordinate => ColorSource::Axis(2),
            MeshColorOption::Normal => ColorSource::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_size_clamps() {
        let mut option = RenderOption::default();
        option.change_point_size(100.0);
        assert_eq!(option.point_size, POINT_SIZE_MAX);
        option.change_point_size(-100.0);
        assert_eq!(option.point_size, POINT_SIZE_MIN);

        option.change_line_width(3.0);
        assert_eq!(option.line_width, 4.0);
        option.change_line_width(20.0);
        assert_eq!(option.line_width, LINE_WIDTH_MAX);
    }

    #[test]
    fn test_toggles_cycle() {
        let mut option = RenderOption::default();
        let start = option.image_stretch_option;
        for _ in 0..3 {
            option.toggle_image_stretch_option();
        }
        assert_eq!(option.image_stretch_option, start);

        option.toggle_shading_option();
        assert_eq!(option.mesh_shade_option, MeshShadeOption::SmoothShade);
        option.toggle_interpolation_option();
        assert_eq!(option.interpolation_option, TextureInterpolationOption::Nearest);
    }

    #[test]
    fn test_digit_options() {
        assert_eq!(PointColorOption::from_digit(9), Some(PointColorOption::Normal));
        assert_eq!(MeshColorOption::from_digit(0), Some(MeshColorOption::Default));
        assert_eq!(PointColorOption::from_digit(7), None);
    }

    #[test]
    fn test_json_round_trip() {
        let mut option = RenderOption::default();
        option.point_size = 9.0;
        option.point_color_option = PointColorOption::Normal;
        option.mesh_show_wireframe = true;
        option.color_map = ColorMapOption::Winter;

        let path = std::env::temp_dir().join(format!("geoviz_render_option_{}.json", std::process::id()));
        option.save_to_json(&path).unwrap();
        let loaded = RenderOption::load_from_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, option);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let option: RenderOption = serde_json::from_str(r#"{ "point_size": 3.0 }"#).unwrap();
        assert_eq!(option.point_size, 3.0);
        assert_eq!(option.mesh_color_option, MeshColorOption::Color);
        assert!(option.light_on);
    }
}

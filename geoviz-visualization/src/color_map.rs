//! Scalar-to-color maps for coordinate coloring

use geoviz_core::Color3f;
use serde::{Deserialize, Serialize};

/// Color map used when geometry is colored by a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMapOption {
    Gray,
    #[default]
    Jet,
    Summer,
    Winter,
    Hot,
}

impl ColorMapOption {
    /// Color of `value`, clamped to [0, 1]
    pub fn color(self, value: f32) -> Color3f {
        let value = value.clamp(0.0, 1.0);
        match self {
            ColorMapOption::Gray => Color3f::new(value, value, value),
            ColorMapOption::Jet => Color3f::new(
                jet_base(value * 2.0 - 1.5),
                jet_base(value * 2.0 - 1.0),
                jet_base(value * 2.0 - 0.5),
            ),
            ColorMapOption::Summer => Color3f::new(
                interpolate(value, 0.0, 0.0, 1.0, 1.0),
                interpolate(value, 0.5, 0.0, 1.0, 1.0),
                0.4,
            ),
            ColorMapOption::Winter => Color3f::new(
                0.0,
                interpolate(value, 0.0, 0.0, 1.0, 1.0),
                interpolate(value, 1.0, 0.0, 0.5, 1.0),
            ),
            ColorMapOption::Hot => hot(value),
        }
    }

    /// Map for a digit key with shift held
    pub fn from_digit(digit: u32) -> Option<Self> {
        match digit {
            0 => Some(ColorMapOption::Gray),
            1 => Some(ColorMapOption::Jet),
            2 => Some(ColorMapOption::Summer),
            3 => Some(ColorMapOption::Winter),
            4 => Some(ColorMapOption::Hot),
            _ => None,
        }
    }
}

/// Linear ramp from `(x0, y0)` to `(x1, y1)`, flat outside
fn interpolate(value: f32, y0: f32, x0: f32, y1: f32, x1: f32) -> f32 {
    if value < x0 {
        y0
    } else if value > x1 {
        y1
    } else {
        (value - x0) * (y1 - y0) / (x1 - x0) + y0
    }
}

fn jet_base(value: f32) -> f32 {
    if value <= -0.75 {
        0.0
    } else if value <= -0.25 {
        interpolate(value, 0.0, -0.75, 1.0, -0.25)
    } else if value <= 0.25 {
        1.0
    } else if value <= 0.75 {
        interpolate(value, 1.0, 0.25, 0.0, 0.75)
    } else {
        0.0
    }
}

// Black through red and yellow to white
fn hot(value: f32) -> Color3f {
    const EDGES: [[f32; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [1.0, 1.0, 1.0],
    ];
    let scaled = value * 3.0;
    let segment = (scaled.floor() as usize).min(2);
    let t = scaled - segment as f32;
    let [from, to] = [EDGES[segment], EDGES[segment + 1]];
    Color3f::new(
        from[0] + (to[0] - from[0]) * t,
        from[1] + (to[1] - from[1]) * t,
        from[2] + (to[2] - from[2]) * t,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_jet_endpoints() {
        assert_relative_eq!(ColorMapOption::Jet.color(0.0), Color3f::new(0.0, 0.0, 0.5));
        assert_relative_eq!(ColorMapOption::Jet.color(0.5), Color3f::new(0.5, 1.0, 0.5));
        assert_relative_eq!(ColorMapOption::Jet.color(1.0), Color3f::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_hot_runs_black_to_white() {
        assert_relative_eq!(ColorMapOption::Hot.color(0.0), Color3f::zeros());
        assert_relative_eq!(ColorMapOption::Hot.color(1.0), Color3f::new(1.0, 1.0, 1.0));
        assert_relative_eq!(ColorMapOption::Hot.color(0.5), Color3f::new(1.0, 0.5, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        for map in [
            ColorMapOption::Gray,
            ColorMapOption::Jet,
            ColorMapOption::Summer,
            ColorMapOption::Winter,
            ColorMapOption::Hot,
        ] {
            assert_eq!(map.color(-3.0), map.color(0.0));
            assert_eq!(map.color(7.0), map.color(1.0));
        }
    }
}

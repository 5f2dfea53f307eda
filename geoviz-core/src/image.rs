//! 8-bit raster images

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An 8-bit image with 1 (gray), 3 (RGB) or 4 (RGBA) interleaved channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub num_channels: u32,
    pub data: Vec<u8>,
}

/// Size of an interleaved buffer, computed in `usize` so large images do not wrap
fn byte_len(width: u32, height: u32, num_channels: u32) -> usize {
    (width as usize) * (height as usize) * (num_channels as usize)
}

impl Image {
    /// Create a zero-filled image
    pub fn new(width: u32, height: u32, num_channels: u32) -> Self {
        Self {
            width,
            height,
            num_channels,
            data: vec![0; byte_len(width, height, num_channels)],
        }
    }

    /// Wrap raw interleaved pixel data
    pub fn from_raw(width: u32, height: u32, num_channels: u32, data: Vec<u8>) -> Result<Self> {
        if !matches!(num_channels, 1 | 3 | 4) {
            return Err(Error::InvalidData(format!(
                "unsupported channel count {num_channels}"
            )));
        }
        let expected = byte_len(width, height, num_channels);
        if data.len() != expected {
            return Err(Error::InvalidData(format!(
                "image data has {} bytes, expected {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            num_channels,
            data,
        })
    }

    /// Convert any decoded image into an RGBA image
    pub fn from_dynamic_image(image: &::image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            num_channels: 4,
            data: rgba.into_raw(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Pixels expanded to RGBA, gray replicated across color channels
    pub fn to_rgba8(&self) -> Vec<u8> {
        let pixel_count = byte_len(self.width, self.height, 1);
        match self.num_channels {
            4 => self.data.clone(),
            3 => self
                .data
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
                .collect(),
            1 => self.data.iter().flat_map(|&g| [g, g, g, 255]).collect(),
            _ => vec![0; pixel_count * 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_validates_size() {
        assert!(Image::from_raw(2, 2, 3, vec![0; 12]).is_ok());
        assert!(Image::from_raw(2, 2, 3, vec![0; 11]).is_err());
        assert!(Image::from_raw(2, 2, 2, vec![0; 8]).is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_byte_len_does_not_wrap() {
        assert_eq!(byte_len(70_000, 70_000, 4), 19_600_000_000);
        assert_eq!(Image::new(3, 2, 4).data.len(), 24);
    }

    #[test]
    fn test_gray_to_rgba() {
        let image = Image::from_raw(2, 1, 1, vec![10, 200]).unwrap();
        assert_eq!(image.to_rgba8(), vec![10, 10, 10, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn test_from_dynamic_image() {
        let rgb = ::image::RgbImage::from_pixel(3, 2, ::image::Rgb([1, 2, 3]));
        let converted = Image::from_dynamic_image(&::image::DynamicImage::ImageRgb8(rgb));
        assert_eq!((converted.width, converted.height, converted.num_channels), (3, 2, 4));
        assert_eq!(&converted.data[..4], &[1, 2, 3, 255]);
    }
}

//! SIMD-accelerated resizing via fast_image_resize.
//!
//! Two shapes are needed: an area-averaged RGB square for the background
//! classifier and a grayscale square for fingerprinting.

use crate::error::DecodeError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage, ImageBuffer, RgbImage};

/// Reusable resizer; keeping one around avoids reallocating its buffers
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    /// Create a new resizer
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Downsample to `size`×`size` RGB with a box filter.
    ///
    /// A box filter averages every source pixel under a destination pixel,
    /// so neither bright nor dark areas are over-represented. Images that
    /// are already the right size are returned untouched.
    pub fn downsample_rgb(&mut self, image: &DynamicImage, size: u32) -> Result<RgbImage, DecodeError> {
        let rgb = image.to_rgb8();
        if rgb.width() == size && rgb.height() == size {
            return Ok(rgb);
        }
        let (width, height) = (rgb.width(), rgb.height());
        let raw = self.resize_raw(
            width,
            height,
            rgb.into_raw(),
            PixelType::U8x3,
            size,
            FilterType::Box,
        )?;
        ImageBuffer::from_raw(size, size, raw)
            .ok_or_else(|| DecodeError::Resize("Failed to create RGB result buffer".to_string()))
    }

    /// Convert to grayscale and resize to `size`×`size` with Lanczos3
    pub fn resize_to_grayscale(&mut self, image: &DynamicImage, size: u32) -> Result<GrayImage, DecodeError> {
        let gray = image.to_luma8();
        if gray.width() == size && gray.height() == size {
            return Ok(gray);
        }
        let (width, height) = (gray.width(), gray.height());
        let raw = self.resize_raw(
            width,
            height,
            gray.into_raw(),
            PixelType::U8,
            size,
            FilterType::Lanczos3,
        )?;
        ImageBuffer::from_raw(size, size, raw)
            .ok_or_else(|| DecodeError::Resize("Failed to create gray result buffer".to_string()))
    }

    fn resize_raw(
        &mut self,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        pixel_type: PixelType,
        size: u32,
        filter: FilterType,
    ) -> Result<Vec<u8>, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::Resize("Invalid source dimensions".to_string()));
        }
        if size == 0 {
            return Err(DecodeError::Resize("Invalid destination size".to_string()));
        }

        let src_image = Image::from_vec_u8(width, height, pixels, pixel_type)
            .map_err(|e| DecodeError::Resize(format!("Failed to create source image: {}", e)))?;
        let mut dst_image = Image::new(size, size, pixel_type);

        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(filter));
        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| DecodeError::Resize(e.to_string()))?;

        Ok(dst_image.into_vec())
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

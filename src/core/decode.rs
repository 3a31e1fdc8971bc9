//! Image decoding with a fast path for JPEG.
//!
//! JPEGs go through zune-jpeg first; everything else (and any JPEG
//! zune-jpeg rejects) goes through the image crate with the format
//! sniffed from the file content rather than the extension.

use crate::error::DecodeError;
use image::{DynamicImage, ImageBuffer, ImageReader, Luma, Rgb, Rgba};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Decode the image at `path`
pub fn decode(path: &Path) -> Result<DynamicImage, DecodeError> {
    let image = if is_jpeg(path) {
        decode_jpeg(path).or_else(|_| decode_fallback(path))?
    } else {
        decode_fallback(path)?
    };

    if image.width() == 0 || image.height() == 0 {
        return Err(DecodeError::EmptyImage {
            path: path.to_path_buf(),
        });
    }
    Ok(image)
}

fn is_jpeg(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg")
    )
}

fn decode_jpeg(path: &Path) -> Result<DynamicImage, DecodeError> {
    let file_bytes = fs::read(path).map_err(|e| DecodeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(&file_bytes, options);

    let pixels = decoder.decode().map_err(|e| DecodeError::Decode {
        path: path.to_path_buf(),
        reason: format!("zune-jpeg decode failed: {:?}", e),
    })?;

    let info = decoder.info().ok_or_else(|| DecodeError::Decode {
        path: path.to_path_buf(),
        reason: "Failed to get image info".to_string(),
    })?;
    let width = info.width as u32;
    let height = info.height as u32;

    let buffer_error = |kind: &str| DecodeError::Decode {
        path: path.to_path_buf(),
        reason: format!("Failed to create {} buffer", kind),
    };

    match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
        ColorSpace::RGB => {
            let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("RGB"))?;
            Ok(DynamicImage::ImageRgb8(buffer))
        }
        ColorSpace::RGBA => {
            let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("RGBA"))?;
            Ok(DynamicImage::ImageRgba8(buffer))
        }
        ColorSpace::Luma => {
            let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("Luma"))?;
            Ok(DynamicImage::ImageLuma8(buffer))
        }
        other => Err(DecodeError::Decode {
            path: path.to_path_buf(),
            reason: format!("unsupported JPEG colorspace {:?}", other),
        }),
    }
}

fn decode_fallback(path: &Path) -> Result<DynamicImage, DecodeError> {
    let reader = ImageReader::open(path)
        .map_err(|e| DecodeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?
        .with_guessed_format()
        .map_err(|e| DecodeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

    reader.decode().map_err(|e| DecodeError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn jpeg_detection_ignores_case() {
        assert!(is_jpeg(Path::new("photo.JPG")));
        assert!(is_jpeg(Path::new("photo.jpeg")));
        assert!(!is_jpeg(Path::new("photo.png")));
        assert!(!is_jpeg(Path::new("photo")));
    }

    #[test]
    fn decodes_jpeg_through_fast_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gray.jpg");
        ImageBuffer::from_pixel(16, 8, Rgb([90u8, 90, 90]))
            .save(&path)
            .unwrap();

        let image = decode(&path).unwrap();
        assert_eq!((image.width(), image.height()), (16, 8));
    }

    #[test]
    fn png_with_wrong_extension_still_decodes() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("real.png");
        ImageBuffer::from_pixel(5, 5, Rgb([1u8, 2, 3])).save(&png).unwrap();
        let disguised = dir.path().join("disguised.jpg");
        fs::rename(&png, &disguised).unwrap();

        let image = decode(&disguised).unwrap();
        assert_eq!(image.width(), 5);
    }

    #[test]
    fn garbage_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"this is not a valid image file").unwrap();

        assert!(decode(&path).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = decode(Path::new("/nonexistent/file.png"));
        assert!(matches!(result, Err(DecodeError::Io { .. })));
    }
}

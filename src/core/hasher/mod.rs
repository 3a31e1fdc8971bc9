//! # Hasher Module
//!
//! Computes 64-bit perceptual fingerprints for duplicate detection.
//!
//! ## How It Works
//! 1. Decode the image (zune-jpeg fast path for JPEG)
//! 2. Convert to luminance and resize to a fixed 256×256 square
//! 3. Hand the square to `image_hasher` for an 8×8 DCT hash with a
//!    median threshold (pHash)
//! 4. Compare fingerprints by Hamming distance
//!
//! ## Example
//! ```rust,ignore
//! use photo_triage::core::hasher::FingerprintHasher;
//!
//! let mut hasher = FingerprintHasher::new();
//! let a = hasher.fingerprint_file(Path::new("a.jpg"))?;
//! let b = hasher.fingerprint_file(Path::new("b.jpg"))?;
//! println!("similarity {:.3}", a.similarity(&b));
//! ```

use crate::core::decode;
use crate::core::resize::FastResizer;
use crate::error::DecodeError;
use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Side of the grayscale square fed to the hash
pub const PREPROCESS_SIZE: u32 = 256;

/// Side of the hash grid; 8×8 gives 64 bits
pub const HASH_SIZE: u32 = 8;

/// Number of bits in a fingerprint
pub const FINGERPRINT_BITS: u32 = HASH_SIZE * HASH_SIZE;

/// A 64-bit perceptual hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerceptualFingerprint(pub u64);

impl PerceptualFingerprint {
    /// Number of differing bits
    pub fn distance(&self, other: &Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// `1 - distance / 64`: 1.0 for identical, 0.0 for fully inverted
    pub fn similarity(&self, other: &Self) -> f64 {
        1.0 - self.distance(other) as f64 / FINGERPRINT_BITS as f64
    }

    /// Lowercase hex, 16 characters
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for PerceptualFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Produces [`PerceptualFingerprint`]s from files or decoded images
pub struct FingerprintHasher {
    hasher: Hasher,
    resizer: FastResizer,
}

impl FingerprintHasher {
    /// pHash: DCT preprocessing, median threshold, 8×8 grid
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(HASH_SIZE, HASH_SIZE)
            .hash_alg(HashAlg::Median)
            .preproc_dct()
            .to_hasher();

        Self {
            hasher,
            resizer: FastResizer::new(),
        }
    }

    /// Decode `path` and fingerprint it
    pub fn fingerprint_file(&mut self, path: &Path) -> Result<PerceptualFingerprint, DecodeError> {
        let image = decode::decode(path)?;
        self.fingerprint_image(&image)
    }

    /// Fingerprint an already decoded image
    pub fn fingerprint_image(&mut self, image: &DynamicImage) -> Result<PerceptualFingerprint, DecodeError> {
        let gray = self.resizer.resize_to_grayscale(image, PREPROCESS_SIZE)?;
        let hash = self.hasher.hash_image(&DynamicImage::ImageLuma8(gray));

        let bytes: [u8; 8] = hash
            .as_bytes()
            .try_into()
            .map_err(|_| DecodeError::Resize(format!("unexpected hash length {}", hash.as_bytes().len())))?;
        Ok(PerceptualFingerprint(u64::from_be_bytes(bytes)))
    }
}

impl Default for FingerprintHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use image::{ImageBuffer, Rgb, RgbImage};

    /// 64×64 image of 8px blocks with pseudo-random gray levels.
    ///
    /// Different seeds give fingerprints far apart; the same seed gives
    /// identical pixels.
    pub fn noise_blocks(seed: u32) -> RgbImage {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(12_345);
        let mut levels = [0u8; 64];
        for level in levels.iter_mut() {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            *level = (state >> 16) as u8;
        }
        ImageBuffer::from_fn(64, 64, |x, y| {
            let v = levels[((y / 8) * 8 + x / 8) as usize];
            Rgb([v, v, v])
        })
    }
}

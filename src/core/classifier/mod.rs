//! # Classifier Module
//!
//! Decides whether an image is dominated by a near-white or a near-black
//! background.
//!
//! ## How It Works
//! 1. Decode the image
//! 2. Downsample to N×N with an area-averaging filter
//! 3. Count pixels whose three channels are all ≥ W (white) or all ≤ D (dark)
//! 4. Turn the counts into percentages of N² and compare against the thresholds
//!
//! Dominance is strict: a percentage equal to its threshold is not dominant.

use crate::core::decode;
use crate::core::resize::FastResizer;
use crate::error::DecodeError;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds for one classification run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// Side of the downsampled square (N)
    pub resize_size: u32,
    /// All channels at or above this make a pixel white (W)
    pub white_pixel_min: u8,
    /// White-dominant above this percent (Tw)
    pub white_threshold_percent: f64,
    /// All channels at or below this make a pixel dark (D)
    pub dark_pixel_max: u8,
    /// Dark-dominant above this percent (Td)
    pub dark_threshold_percent: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        crate::config::Config::default().classifier_settings()
    }
}

/// Outcome of analysing one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_white_dominant: bool,
    pub white_percent: f64,
    pub is_dark_dominant: bool,
    /// Only measured when the image is not white-dominant; 0.0 otherwise
    pub dark_percent: f64,
    /// Set when the image could not be analysed
    pub error: Option<String>,
}

impl ClassificationResult {
    /// Result for an image that could not be analysed
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            is_white_dominant: false,
            white_percent: 0.0,
            is_dark_dominant: false,
            dark_percent: 0.0,
            error: Some(reason.into()),
        }
    }

    /// True when analysis failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Stateless analyser; owns only a resize scratch buffer
pub struct BackgroundClassifier {
    settings: ClassifierSettings,
    resizer: FastResizer,
}

impl BackgroundClassifier {
    /// Create a classifier for one run
    pub fn new(settings: ClassifierSettings) -> Self {
        Self {
            settings,
            resizer: FastResizer::new(),
        }
    }

    /// The thresholds in use
    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Decode and classify the file at `path`.
    ///
    /// Never fails: decode and resize problems come back in `error`.
    pub fn classify_file(&mut self, path: &Path) -> ClassificationResult {
        match decode::decode(path) {
            Ok(image) => self.classify_image(&image),
            Err(e) => e.into(),
        }
    }

    /// Classify an already decoded image
    pub fn classify_image(&mut self, image: &DynamicImage) -> ClassificationResult {
        match self.resizer.downsample_rgb(image, self.settings.resize_size) {
            Ok(small) => self.classify_downsampled(&small),
            Err(e) => ClassificationResult::failed(format!("Error analyzing image: {}", e)),
        }
    }

    fn classify_downsampled(&self, small: &RgbImage) -> ClassificationResult {
        let s = &self.settings;
        let total = (s.resize_size as f64) * (s.resize_size as f64);

        let white_count = small
            .pixels()
            .filter(|p| p.0.iter().all(|&c| c >= s.white_pixel_min))
            .count();
        let white_percent = white_count as f64 / total * 100.0;
        let is_white_dominant = white_percent > s.white_threshold_percent;

        if is_white_dominant {
            return ClassificationResult {
                is_white_dominant,
                white_percent,
                is_dark_dominant: false,
                dark_percent: 0.0,
                error: None,
            };
        }

        let dark_count = small
            .pixels()
            .filter(|p| p.0.iter().all(|&c| c <= s.dark_pixel_max))
            .count();
        let dark_percent = dark_count as f64 / total * 100.0;

        ClassificationResult {
            is_white_dominant,
            white_percent,
            is_dark_dominant: dark_percent > s.dark_threshold_percent,
            dark_percent,
            error: None,
        }
    }
}

impl From<DecodeError> for ClassificationResult {
    fn from(error: DecodeError) -> Self {
        ClassificationResult::failed(format!("Failed to load image: {}", error))
    }
}

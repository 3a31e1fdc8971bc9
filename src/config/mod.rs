//! # Config Module
//!
//! The configuration record read by every operation. A `Config` is built
//! once per run (defaults, then a JSON file, then CLI overrides) and passed
//! by reference; nothing in the core mutates it.
//!
//! ## JSON format
//! Every field is optional; missing fields keep their defaults.
//! ```json
//! {
//!   "import_path": "./Import",
//!   "white_threshold_percent": 70,
//!   "supported_extensions": [".jpg", ".JPEG", "png"]
//! }
//! ```

use crate::core::classifier::ClassifierSettings;
use crate::error::{PhotoTriageError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions accepted when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "webp"];

/// Per-run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder holding the photos to triage
    pub import_path: PathBuf,
    /// Destination for keepers (and non-image files)
    pub wanted_path: PathBuf,
    /// Destination for rejects
    pub unwanted_path: PathBuf,
    /// Side length of the square the classifier downsamples to
    pub resize_size: u32,
    /// Percent of white pixels above which an image is white-dominant
    pub white_threshold_percent: f64,
    /// Channel floor for a pixel to count as white
    pub white_pixel_min: u8,
    /// Percent of dark pixels above which an image is dark-dominant
    pub dark_threshold_percent: f64,
    /// Channel ceiling for a pixel to count as dark
    pub dark_pixel_max: u8,
    /// Prefix wanted files with their EXIF capture date
    pub rename: bool,
    /// Emit per-file progress text
    pub verbose: bool,
    /// Flatten the import folder before triage
    #[serde(alias = "flatten_import_folder")]
    pub flatten_import: bool,
    /// Classify and report without moving anything
    pub dry_run: bool,
    /// Image extensions, case-insensitive, with or without a leading dot
    pub supported_extensions: Vec<String>,
    /// Minimum similarity (0-1) for two images to be grouped as duplicates
    pub similarity_threshold: f64,
    /// Flat file caching the last duplicate grouping
    pub duplicate_cache: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            import_path: PathBuf::from("./Import"),
            wanted_path: PathBuf::from("./Wanted"),
            unwanted_path: PathBuf::from("./Unwanted"),
            resize_size: 300,
            white_threshold_percent: 70.0,
            white_pixel_min: 240,
            dark_threshold_percent: 70.0,
            dark_pixel_max: 50,
            rename: true,
            verbose: true,
            flatten_import: false,
            dry_run: false,
            supported_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            similarity_threshold: 0.9,
            duplicate_cache: None,
        }
    }
}

impl Config {
    /// Load a JSON config file, filling missing fields with defaults.
    ///
    /// The result is normalized and validated.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            PhotoTriageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            PhotoTriageError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.normalized().validated()
    }

    /// Lowercase and de-dot the extension list, dropping blanks and repeats
    pub fn normalized(mut self) -> Self {
        let mut extensions: Vec<String> = self
            .supported_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        self.supported_extensions = extensions;
        self
    }

    /// Reject values no operation can work with
    pub fn validate(&self) -> Result<()> {
        if self.resize_size == 0 {
            return Err(PhotoTriageError::Config(
                "resize_size must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("white_threshold_percent", self.white_threshold_percent),
            ("dark_threshold_percent", self.dark_threshold_percent),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(PhotoTriageError::Config(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(PhotoTriageError::Config(format!(
                "similarity_threshold must be between 0 and 1, got {}",
                self.similarity_threshold
            )));
        }
        if self.supported_extensions.is_empty() {
            return Err(PhotoTriageError::Config(
                "supported_extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Thresholds for the background classifier
    pub fn classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            resize_size: self.resize_size,
            white_pixel_min: self.white_pixel_min,
            white_threshold_percent: self.white_threshold_percent,
            dark_pixel_max: self.dark_pixel_max,
            dark_threshold_percent: self.dark_threshold_percent,
        }
    }
}

/// `.JPG` -> `jpg`
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

//! # Scanner Module
//!
//! Discovers image files in directories.
//!
//! ## Matching
//! A file is a candidate when its extension, compared case-insensitively,
//! is in the configured set. Each directory is listed exactly once, so
//! `IMG.JPG` and `img.jpg` variants of the same extension cannot be
//! counted twice.
//!
//! ## Example
//! ```rust,ignore
//! use photo_triage::core::scanner::FileDiscoverer;
//!
//! let discoverer = FileDiscoverer::new(&["jpg", "png"]);
//! let images = discoverer.discover(Path::new("./Import"), &null_sender())?;
//! ```

mod filter;
mod walker;

pub use filter::ExtensionFilter;
pub use walker::FileDiscoverer;
pub(crate) use walker::check_root;

use crate::core::metadata::{self, PhotoMetadata};
use crate::error::MetadataError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A discovered file and the attributes that can be read from it on demand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl ImageFile {
    /// Stat `path` and wrap it
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }

    /// File name for display
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Pixel dimensions, read from the image header only
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::image_dimensions(&self.path).ok()
    }

    /// Capture date as `YYYYMMDD`
    pub fn capture_date(&self) -> Result<String, MetadataError> {
        metadata::capture_date_token(&self.path)
    }

    /// Full EXIF summary (date, camera, dimensions)
    pub fn metadata(&self) -> PhotoMetadata {
        metadata::extract_metadata(&self.path)
    }

    /// File size in megabytes
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

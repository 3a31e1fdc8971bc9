//! # Metadata Module
//!
//! Reads EXIF metadata from photo files.
//!
//! The triage pipeline only needs the capture date, formatted as a
//! sortable `YYYYMMDD` token for renaming kept photos. The rest of
//! [`PhotoMetadata`] backs the `discover --details` listing.
//!
//! A missing date is never fatal: [`capture_date_token`] says why it has
//! no answer and the caller keeps the original file name.

use crate::error::MetadataError;
use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{Exif, In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Layout of EXIF date/time strings
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Layout of the rename prefix
const DATE_TOKEN_FORMAT: &str = "%Y%m%d";

/// Extracted photo metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    /// Original capture date/time
    pub date_taken: Option<DateTime<Utc>>,
    /// Image width in pixels
    pub width: Option<u32>,
    /// Image height in pixels
    pub height: Option<u32>,
    /// Camera make (e.g., "Canon")
    pub camera_make: Option<String>,
    /// Camera model (e.g., "EOS R5")
    pub camera_model: Option<String>,
    /// Image orientation (1-8, where 1 is normal)
    pub orientation: Option<u16>,
}

impl PhotoMetadata {
    /// Check if any metadata was extracted
    pub fn has_data(&self) -> bool {
        self.date_taken.is_some()
            || self.width.is_some()
            || self.camera_make.is_some()
            || self.camera_model.is_some()
    }

    /// Make and model joined, without repeating the make
    pub fn camera_display(&self) -> Option<String> {
        match (&self.camera_make, &self.camera_model) {
            (Some(make), Some(model)) if model.starts_with(make.as_str()) => Some(model.clone()),
            (Some(make), Some(model)) => Some(format!("{} {}", make, model)),
            (None, Some(model)) => Some(model.clone()),
            (Some(make), None) => Some(make.clone()),
            (None, None) => None,
        }
    }

    /// `WIDTHxHEIGHT` when both are known
    pub fn dimensions_display(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }

    /// Capture date as a `YYYYMMDD` token
    pub fn date_token(&self) -> Option<String> {
        self.date_taken
            .map(|d| d.format(DATE_TOKEN_FORMAT).to_string())
    }
}

fn read_exif(path: &Path) -> Result<Exif, MetadataError> {
    let no_exif = || MetadataError::NoExif {
        path: path.to_path_buf(),
    };
    let file = File::open(path).map_err(|_| no_exif())?;
    let mut reader = BufReader::new(file);
    Reader::new()
        .read_from_container(&mut reader)
        .map_err(|_| no_exif())
}

/// Read `DateTimeOriginal` and format it as `YYYYMMDD`.
///
/// Errors name the reason: no EXIF at all, no `DateTimeOriginal` tag, or
/// a tag value that is not `YYYY:MM:DD HH:MM:SS`.
pub fn capture_date_token(path: &Path) -> Result<String, MetadataError> {
    let exif = read_exif(path)?;
    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .ok_or_else(|| MetadataError::TagMissing {
            path: path.to_path_buf(),
        })?;

    let raw = get_string_value(&field.value).ok_or_else(|| MetadataError::Malformed {
        path: path.to_path_buf(),
        value: field.display_value().to_string(),
    })?;

    parse_exif_datetime(&raw)
        .map(|naive| naive.format(DATE_TOKEN_FORMAT).to_string())
        .ok_or_else(|| MetadataError::Malformed {
            path: path.to_path_buf(),
            value: raw,
        })
}

fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), EXIF_DATETIME_FORMAT).ok()
}

/// Best-effort EXIF summary; anything unreadable is left as `None`
pub fn extract_metadata(path: &Path) -> PhotoMetadata {
    let exif = match read_exif(path) {
        Ok(exif) => exif,
        Err(_) => return PhotoMetadata::default(),
    };
    let field = |tag: Tag| exif.get_field(tag, In::PRIMARY).map(|f| &f.value);

    let date_taken = field(Tag::DateTimeOriginal)
        .and_then(get_string_value)
        .and_then(|s| parse_exif_datetime(&s))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));

    // Pixel dimensions describe the stored image; ImageWidth may refer to the thumbnail
    let width = field(Tag::PixelXDimension)
        .and_then(get_u32_value)
        .or_else(|| field(Tag::ImageWidth).and_then(get_u32_value));
    let height = field(Tag::PixelYDimension)
        .and_then(get_u32_value)
        .or_else(|| field(Tag::ImageLength).and_then(get_u32_value));

    let orientation = match field(Tag::Orientation) {
        Some(Value::Short(values)) => values.first().copied(),
        _ => None,
    };

    PhotoMetadata {
        date_taken,
        width,
        height,
        camera_make: field(Tag::Make).and_then(get_string_value),
        camera_model: field(Tag::Model).and_then(get_string_value),
        orientation,
    }
}

fn get_u32_value(value: &Value) -> Option<u32> {
    match value {
        Value::Long(vec) => vec.first().copied(),
        Value::Short(vec) => vec.first().map(|v| *v as u32),
        _ => None,
    }
}

fn get_string_value(value: &Value) -> Option<String> {
    let Value::Ascii(vec) = value else {
        return None;
    };
    let bytes = vec.first()?;
    let s = std::str::from_utf8(bytes).ok()?;
    let trimmed = s.trim_end_matches('\0').trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

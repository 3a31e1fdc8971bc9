//! # Error Module
//!
//! User-friendly error types for the photo triage engine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file failures are data** - they become events and counters,
//!   only pre-flight failures abort a run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum PhotoTriageError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("File operation failed: {0}")]
    FileOperation(#[from] FileOpError),

    #[error("Duplicate cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while discovering files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while decoding or resampling an image.
///
/// Per-file only: they end up in a classification result or an event.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Resize failed: {0}")]
    Resize(String),
}

/// Reasons a capture date could not be produced.
///
/// These are informational: a missing date never blocks a move.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("No EXIF data found in {path}")]
    NoExif { path: PathBuf },

    #[error("DateTimeOriginal tag not found in {path}")]
    TagMissing { path: PathBuf },

    #[error("Malformed capture date '{value}' in {path}")]
    Malformed { path: PathBuf, value: String },
}

/// Errors from moving files and removing directories
#[derive(Error, Debug)]
pub enum FileOpError {
    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove directory {path}: {source}")]
    RemoveDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to restore timestamps on {path}: {source}")]
    Timestamps {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur with the duplicate cache file
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read duplicate cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write duplicate cache {path}: {source}. Delete this file and try again.")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PhotoTriageError>;

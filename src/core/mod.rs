//! # Core Module
//!
//! The UI-agnostic triage and deduplication engine.
//!
//! ## Modules
//! - `paths` - Conflict-free destination names and the move primitive
//! - `flatten` - Collapses a nested folder into its root
//! - `scanner` - Discovers image files in directories
//! - `decode` - Image decoding with a fast JPEG path
//! - `resize` - SIMD-accelerated downsampling
//! - `classifier` - White/dark background analysis
//! - `metadata` - EXIF capture dates and camera info
//! - `triage` - Orchestrates classify-and-move runs
//! - `hasher` - Perceptual fingerprints
//! - `duplicates` - Groups near-duplicate images, with a flat-file cache

pub mod classifier;
pub mod decode;
pub mod duplicates;
pub mod flatten;
pub mod hasher;
pub mod metadata;
pub mod paths;
pub mod resize;
pub mod scanner;
pub mod triage;

// Re-export commonly used types
pub use classifier::{BackgroundClassifier, ClassificationResult, ClassifierSettings};
pub use duplicates::{find_duplicates_cached, DuplicateCache, DuplicateGroup, PerceptualHashGrouper};
pub use flatten::{DirectoryFlattener, FlattenOptions, FlattenReport};
pub use hasher::{FingerprintHasher, PerceptualFingerprint};
pub use metadata::PhotoMetadata;
pub use scanner::ImageFile;
pub use triage::{
    CancellationToken, Stats, TriageOutcome, TriagePipeline, TriageRecord, TriageReport,
};

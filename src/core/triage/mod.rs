//! # Triage Module
//!
//! Sorts an import folder into Wanted and Unwanted.
//!
//! ## Pipeline Stages
//! 1. **Pre-flight** - the import folder must exist; destinations are created
//! 2. **Flatten** - optional, pulls nested files up into the import root
//! 3. **Non-images** - files at the import root that are not images go to Wanted
//! 4. **Classify** - every image, in path order, is classified and moved:
//!    white-dominant to Unwanted, dark-dominant to Wanted (date-prefixed
//!    when EXIF allows), anything else to Unwanted
//!
//! Only the pre-flight can fail the run. Per-file problems are reported as
//! events and counted.

mod executor;

pub use executor::TriagePipeline;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where one file ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriageOutcome {
    /// Dark-dominant image sent to Wanted
    Wanted,
    /// White-dominant, undecided or unreadable image sent to Unwanted
    Unwanted,
    /// Non-image file sent to Wanted
    NonImage,
    /// The move failed; the file stays where it was
    Error,
}

/// Counters for one triage run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub wanted: usize,
    pub unwanted: usize,
    pub non_image_files: usize,
    pub errors: usize,
}

impl Stats {
    /// Bump the counter matching `outcome`
    pub fn record(&mut self, outcome: TriageOutcome) {
        match outcome {
            TriageOutcome::Wanted => self.wanted += 1,
            TriageOutcome::Unwanted => self.unwanted += 1,
            TriageOutcome::NonImage => self.non_image_files += 1,
            TriageOutcome::Error => self.errors += 1,
        }
    }

    /// Files handled in total
    pub fn total(&self) -> usize {
        self.wanted + self.unwanted + self.non_image_files + self.errors
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wanted: {}, Unwanted: {}, Non-image files: {}, Errors: {}",
            self.wanted, self.unwanted, self.non_image_files, self.errors
        )
    }
}

/// One file's trip through the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRecord {
    pub source: PathBuf,
    pub outcome: TriageOutcome,
    /// Final path; `None` for failed moves and dry runs
    pub destination: Option<PathBuf>,
}

/// Result of [`TriagePipeline::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageReport {
    pub stats: Stats,
    /// The run stopped early on request
    pub cancelled: bool,
    /// In processing order
    pub records: Vec<TriageRecord>,
}

impl TriageReport {
    pub(crate) fn push(&mut self, source: PathBuf, outcome: TriageOutcome, destination: Option<PathBuf>) {
        self.stats.record(outcome);
        self.records.push(TriageRecord {
            source,
            outcome,
            destination,
        });
    }
}

/// Shared stop flag, checked between files
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

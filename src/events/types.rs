//! Event type definitions for progress reporting.

use crate::core::triage::Stats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// All events emitted by the core operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// General progress text
    Info(String),
    /// A file was (or in a dry run, would be) sent to Wanted
    WantedDecision(String),
    /// A file was (or in a dry run, would be) sent to Unwanted
    UnwantedDecision(String),
    /// A per-item failure; the operation continues
    Error(String),
    /// Position within the current file list
    Progress(Progress),
    /// A discrete step of a flatten run
    Flatten(FlattenEvent),
    /// Final counters of a triage run
    Stats(Stats),
    /// The operation finished (or was cancelled)
    Complete(String),
}

impl Event {
    /// Display text for log-style rendering
    pub fn message(&self) -> String {
        match self {
            Event::Info(msg)
            | Event::WantedDecision(msg)
            | Event::UnwantedDecision(msg)
            | Event::Error(msg)
            | Event::Complete(msg) => msg.clone(),
            Event::Progress(p) => format!("{}/{} {}", p.completed, p.total, p.current.display()),
            Event::Flatten(e) => e.to_string(),
            Event::Stats(stats) => stats.to_string(),
        }
    }
}

/// Progress information for per-file loops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Number of files handled so far (including the current one)
    pub completed: usize,
    /// Total number of files in this phase
    pub total: usize,
    /// File being handled
    pub current: PathBuf,
}

/// Discrete steps reported by the directory flattener.
///
/// Paths are relative to the flattened root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlattenEvent {
    /// Flattening has started
    Started { root: PathBuf },
    /// A subdirectory is about to be emptied
    DirectoryVisited {
        path: PathBuf,
        files: usize,
        dirs: usize,
    },
    /// A file was moved to the root
    FileMoved { from: PathBuf, to: PathBuf },
    /// A file could not be moved (left in place)
    MoveFailed { path: PathBuf, message: String },
    /// Original timestamps could not be restored on a moved file
    TimestampsNotRestored { path: PathBuf, message: String },
    /// An empty directory was removed
    DirectoryRemoved { path: PathBuf },
    /// A directory still had entries on a removal attempt
    DirectoryNotEmpty {
        path: PathBuf,
        attempt: u32,
        entries: Vec<String>,
    },
    /// A removal attempt failed with an I/O error
    RemoveRetryFailed {
        path: PathBuf,
        attempt: u32,
        message: String,
    },
    /// A directory was deleted together with anything left inside it
    ForceRemoved { path: PathBuf },
    /// Deleting a directory with its contents failed; it stays
    ForceRemoveFailed { path: PathBuf, message: String },
    /// A directory could not be listed and was left untouched
    Unreadable { path: PathBuf, message: String },
    /// A non-empty directory left under the root by the final check
    RemainingDirectory { path: PathBuf, entries: Vec<String> },
    /// Flattening finished
    Completed {
        files_moved: usize,
        dirs_removed: usize,
    },
}

impl fmt::Display for FlattenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenEvent::Started { root } => write!(f, "Flattening {}...", root.display()),
            FlattenEvent::DirectoryVisited { path, files, dirs } => write!(
                f,
                "Processing: {} (files: {}, dirs: {})",
                path.display(),
                files,
                dirs
            ),
            FlattenEvent::FileMoved { from, to } => {
                write!(f, "  Moved: {} -> {}", from.display(), to.display())
            }
            FlattenEvent::MoveFailed { path, message } => {
                write!(f, "  Failed to move {}: {}", path.display(), message)
            }
            FlattenEvent::TimestampsNotRestored { path, message } => write!(
                f,
                "  Timestamps not restored on {}: {}",
                path.display(),
                message
            ),
            FlattenEvent::DirectoryRemoved { path } => {
                write!(f, "Removed empty dir: {}", path.display())
            }
            FlattenEvent::DirectoryNotEmpty {
                path,
                attempt,
                entries,
            } => write!(
                f,
                "Dir not empty (attempt {}): {} -> {:?}",
                attempt,
                path.display(),
                entries
            ),
            FlattenEvent::RemoveRetryFailed {
                path,
                attempt,
                message,
            } => write!(
                f,
                "Retry {} failed for {}: {}",
                attempt,
                path.display(),
                message
            ),
            FlattenEvent::ForceRemoved { path } => write!(f, "Force removed: {}", path.display()),
            FlattenEvent::ForceRemoveFailed { path, message } => {
                write!(f, "Could not force remove {}: {}", path.display(), message)
            }
            FlattenEvent::Unreadable { path, message } => {
                write!(f, "Leaving unreadable dir {}: {}", path.display(), message)
            }
            FlattenEvent::RemainingDirectory { path, entries } => write!(
                f,
                "Skipping (has {} items): {}",
                entries.len(),
                path.display()
            ),
            FlattenEvent::Completed {
                files_moved,
                dirs_removed,
            } => write!(
                f,
                "Summary: {} files moved, {} dirs removed.",
                files_moved, dirs_removed
            ),
        }
    }
}

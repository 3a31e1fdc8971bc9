//! # Flatten Module
//!
//! Pulls every file of a nested tree up into its root, then clears the
//! emptied subdirectories.
//!
//! ## Phases
//! 1. **Move** - deepest directories first, each file or symlink goes to
//!    the root under a conflict-free name; files get their access/modify
//!    times restored
//! 2. **Clean** - deepest directories first, each is removed with a few
//!    retries and a pause between attempts; one that will not go is
//!    force-deleted with its contents
//! 3. **Check** - whatever is still directly under the root is removed if
//!    empty and reported otherwise
//!
//! Only a missing root stops the run. Everything else becomes a
//! [`FlattenEvent`] and the walk carries on.

use crate::core::paths;
use crate::core::scanner::check_root;
use crate::error::{FileOpError, ScanError};
use crate::events::{Event, EventSender, FlattenEvent};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Retry policy for directory removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Removal attempts before force-deleting
    pub retries: u32,
    /// Pause after an attempt that failed with an I/O error
    pub backoff: Duration,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Counters and leftovers of one flatten run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenReport {
    pub files_moved: usize,
    pub dirs_removed: usize,
    /// Non-empty directories left directly under the root
    pub remaining: Vec<PathBuf>,
    /// Files that could not be moved
    pub errors: usize,
}

impl FlattenReport {
    /// True when no subdirectory is left
    pub fn is_flat(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Flattens one directory tree
#[derive(Debug, Clone, Default)]
pub struct DirectoryFlattener {
    options: FlattenOptions,
}

impl DirectoryFlattener {
    pub fn new(options: FlattenOptions) -> Self {
        Self { options }
    }

    /// Flatten `root`, reporting each step through `events`
    pub fn flatten(&self, root: &Path, events: &EventSender) -> Result<FlattenReport, ScanError> {
        check_root(root)?;
        info!(root = %root.display(), "flattening");
        events.send(Event::Flatten(FlattenEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut report = FlattenReport::default();
        let subdirs = subdirectories_bottom_up(root, events);

        for dir in &subdirs {
            self.move_files_up(root, dir, &mut report, events);
        }
        for dir in &subdirs {
            if dir.exists() {
                self.remove_with_retries(root, dir, &mut report, events);
            }
        }
        self.final_check(root, &mut report, events);

        events.send(Event::Flatten(FlattenEvent::Completed {
            files_moved: report.files_moved,
            dirs_removed: report.dirs_removed,
        }));
        info!(
            moved = report.files_moved,
            removed = report.dirs_removed,
            remaining = report.remaining.len(),
            "flatten finished"
        );
        Ok(report)
    }

    fn move_files_up(&self, root: &Path, dir: &Path, report: &mut FlattenReport, events: &EventSender) {
        let entries: Vec<_> = match fs::read_dir(dir) {
            Ok(read) => read.filter_map(|e| e.ok()).collect(),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "cannot list directory");
                events.error(format!("Cannot read {}: {}", relative(root, dir).display(), e));
                return;
            }
        };
        // Symlinks are never followed: a link to a directory moves like a file
        let (dirs, files): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false));

        events.send(Event::Flatten(FlattenEvent::DirectoryVisited {
            path: relative(root, dir),
            files: files.len(),
            dirs: dirs.len(),
        }));

        let mut files: Vec<(PathBuf, bool)> = files
            .into_iter()
            .map(|e| {
                let is_link = e.file_type().map(|t| t.is_symlink()).unwrap_or(false);
                (e.path(), is_link)
            })
            .collect();
        files.sort();

        for (source, is_link) in files {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let times = (!is_link).then(|| paths::read_times(&source));

            match paths::move_into(&source, root, &name) {
                Ok(dest) => {
                    report.files_moved += 1;
                    debug!(from = %source.display(), to = %dest.display(), "moved to root");
                    events.send(Event::Flatten(FlattenEvent::FileMoved {
                        from: relative(root, &source),
                        to: relative(root, &dest),
                    }));

                    if let Some(Err(e)) = times.map(|t| t.and_then(|t| paths::restore_times(&dest, t))) {
                        warn!(error = %e, "timestamps not restored");
                        events.send(Event::Flatten(FlattenEvent::TimestampsNotRestored {
                            path: relative(root, &dest),
                            message: e.to_string(),
                        }));
                    }
                }
                Err(e) => {
                    report.errors += 1;
                    warn!(path = %source.display(), error = %e, "move failed");
                    events.send(Event::Flatten(FlattenEvent::MoveFailed {
                        path: relative(root, &source),
                        message: e.to_string(),
                    }));
                }
            }
        }
    }

    fn remove_with_retries(&self, root: &Path, dir: &Path, report: &mut FlattenReport, events: &EventSender) {
        let rel = relative(root, dir);

        for attempt in 1..=self.options.retries {
            if attempt > 1 {
                self.pause();
            }
            match list_names(dir) {
                Ok(entries) if entries.is_empty() => match fs::remove_dir(dir) {
                    Ok(()) => {
                        report.dirs_removed += 1;
                        events.send(Event::Flatten(FlattenEvent::DirectoryRemoved { path: rel }));
                        return;
                    }
                    Err(e) => report_retry(&rel, attempt, e, events),
                },
                Ok(entries) => {
                    events.send(Event::Flatten(FlattenEvent::DirectoryNotEmpty {
                        path: rel.clone(),
                        attempt,
                        entries,
                    }));
                }
                Err(e) => report_retry(&rel, attempt, e, events),
            }
        }

        force_remove(dir, rel, report, events);
    }

    /// Wait out the backoff between removal attempts
    fn pause(&self) {
        if !self.options.backoff.is_zero() {
            thread::sleep(self.options.backoff);
        }
    }

    fn final_check(&self, root: &Path, report: &mut FlattenReport, events: &EventSender) {
        let mut leftovers: Vec<PathBuf> = match fs::read_dir(root) {
            Ok(read) => read
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                .map(|e| e.path())
                .collect(),
            Err(e) => {
                events.error(format!("Cannot read {}: {}", root.display(), e));
                return;
            }
        };
        leftovers.sort();

        for dir in leftovers {
            let listing = list_names(&dir);
            settle_leftover(root, dir, listing, report, events);
        }
    }
}

/// Final-check verdict on one directory still under the root.
///
/// Empty ones are deleted. Non-empty and unreadable ones are left alone
/// and listed in the report.
fn settle_leftover(
    root: &Path,
    dir: PathBuf,
    listing: io::Result<Vec<String>>,
    report: &mut FlattenReport,
    events: &EventSender,
) {
    let rel = relative(root, &dir);
    match listing {
        Ok(entries) if entries.is_empty() => force_remove(&dir, rel, report, events),
        Ok(entries) => {
            events.send(Event::Flatten(FlattenEvent::RemainingDirectory { path: rel, entries }));
            report.remaining.push(dir);
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "leaving unreadable directory");
            events.send(Event::Flatten(FlattenEvent::Unreadable {
                path: rel,
                message: e.to_string(),
            }));
            report.remaining.push(dir);
        }
    }
}

/// Delete `dir` and whatever is still inside it
fn force_remove(dir: &Path, rel: PathBuf, report: &mut FlattenReport, events: &EventSender) {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            report.dirs_removed += 1;
            warn!(path = %dir.display(), "force removed directory");
            events.send(Event::Flatten(FlattenEvent::ForceRemoved { path: rel }));
        }
        Err(e) => {
            let e = FileOpError::RemoveDir {
                path: dir.to_path_buf(),
                source: e,
            };
            warn!(error = %e, "force removal failed");
            events.send(Event::Flatten(FlattenEvent::ForceRemoveFailed {
                path: rel,
                message: e.to_string(),
            }));
        }
    }
}

fn report_retry(rel: &Path, attempt: u32, error: io::Error, events: &EventSender) {
    events.send(Event::Flatten(FlattenEvent::RemoveRetryFailed {
        path: rel.to_path_buf(),
        attempt,
        message: error.to_string(),
    }));
}

/// Every directory below `root`, children before parents
fn subdirectories_bottom_up(root: &Path, events: &EventSender) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => events.error(format!("Skipping unreadable entry: {}", e)),
        }
    }
    dirs
}

fn list_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}

fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

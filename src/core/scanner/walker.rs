//! Directory walking implementation using walkdir.

use super::filter::ExtensionFilter;
use crate::error::ScanError;
use crate::events::EventSender;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Finds files under a root whose extension is in a set
#[derive(Debug, Clone)]
pub struct FileDiscoverer {
    filter: ExtensionFilter,
    /// Descend into subdirectories
    recursive: bool,
}

impl FileDiscoverer {
    /// Recursive discoverer for `extensions`
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            filter: ExtensionFilter::new(extensions),
            recursive: true,
        }
    }

    /// Only look at the root's direct children when `false`
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// List matching files under `root`, sorted by path, without repeats.
    ///
    /// Fails when `root` is missing, not a directory, or cannot be listed.
    /// Unreadable subdirectories are reported as events and skipped.
    pub fn discover(&self, root: &Path, events: &EventSender) -> Result<Vec<PathBuf>, ScanError> {
        check_root(root)?;

        let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut found = BTreeSet::new();
        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    if self.filter.matches(entry.path()) {
                        found.insert(entry.into_path());
                    }
                }
                Err(e) if e.depth() == 0 => return Err(read_failure(root, e)),
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    events.error(format!("Skipping {}: {}", path.display(), e));
                }
            }
        }

        debug!(root = %root.display(), count = found.len(), "discovery finished");
        Ok(found.into_iter().collect())
    }
}

fn read_failure(root: &Path, error: walkdir::Error) -> ScanError {
    let message = error.to_string();
    ScanError::ReadDirectory {
        path: root.to_path_buf(),
        source: error
            .into_io_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message)),
    }
}

/// Pre-flight check shared by every operation that starts from a folder
pub(crate) fn check_root(root: &Path) -> Result<(), ScanError> {
    if !root.exists() {
        return Err(ScanError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

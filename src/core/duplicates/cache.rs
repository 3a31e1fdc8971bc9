//! Flat-file persistence for duplicate groups.
//!
//! Format: one group per line, paths separated by commas. Paths holding a
//! comma or a line break cannot be written, so such results are not cached.

use super::DuplicateGroup;
use crate::error::CacheError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Duplicate groups saved between runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCache {
    path: PathBuf,
}

impl DuplicateCache {
    /// Cache stored at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read saved groups; `None` when there is no cache file.
    ///
    /// Lines with fewer than two paths are ignored.
    pub fn load(&self) -> Result<Option<Vec<DuplicateGroup>>, CacheError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let groups: Vec<DuplicateGroup> = contents
            .lines()
            .filter_map(|line| {
                let paths: Vec<PathBuf> = line
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect();
                (paths.len() >= 2).then(|| DuplicateGroup::new(paths))
            })
            .collect();

        debug!(path = %self.path.display(), groups = groups.len(), "duplicate cache loaded");
        Ok(Some(groups))
    }

    /// Replace the cache file with `groups`.
    ///
    /// Returns `false` without writing when some path cannot be stored;
    /// any older cache is deleted then so it cannot be mistaken for this
    /// result.
    pub fn save(&self, groups: &[DuplicateGroup]) -> Result<bool, CacheError> {
        let mut contents = String::new();
        for group in groups {
            let line: Vec<String> = group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            if let Some(bad) = line.iter().find(|p| !storable(p)) {
                warn!(path = %bad, "path cannot be stored in the duplicate cache");
                self.invalidate()?;
                return Ok(false);
            }
            contents.push_str(&line.join(","));
            contents.push('\n');
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CacheError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        }
        fs::write(&self.path, contents).map_err(|e| CacheError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(true)
    }

    /// Delete the cache file; a missing file is not an error
    pub fn invalidate(&self) -> Result<bool, CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Write {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

/// Survives the comma-separated, line-per-group format unchanged
fn storable(path: &str) -> bool {
    !path.contains([',', '\n', '\r']) && path.trim() == path
}

//! # Duplicates Module
//!
//! Finds visually duplicate images in one folder.
//!
//! ## Algorithm
//! Every image gets a 64-bit perceptual fingerprint. Clustering is a
//! single greedy pass over the candidates in the order given: each image
//! not yet claimed seeds a group, every other unclaimed image at or above
//! the similarity threshold joins it and is claimed. Groups of one are
//! dropped, so the result is a partition of the duplicated images only.
//!
//! Grouping is not transitive: a joins b's group only if it is similar to
//! the seed, not to any member.
//!
//! ## Caching
//! Results can be kept in a plain text file, one group per line, so a
//! second look at the same folder is instant. The triage pipeline deletes
//! the cache when it starts moving files.
//!
//! ## Resolution
//! [`resolve_keep_largest`] keeps the biggest file of a group and deletes
//! the rest. Resolving clears the cache too, since it would name the
//! deleted files.

mod cache;
mod grouper;
mod resolve;

pub use cache::DuplicateCache;
pub use grouper::PerceptualHashGrouper;
pub use resolve::{resolve_all_keep_largest, resolve_keep_largest, Resolution};

use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Two or more images whose fingerprints match the group's seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Seed first, then members in candidate order
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Wrap a list of paths
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Number of images in the group
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always false for groups produced by the grouper
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Check whether `path` is in this group
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Look for duplicates in `folder`, going through `cache` when given.
///
/// A cache that exists is trusted unless `refresh` is set. Otherwise the
/// folder is grouped and the result saved; failing to save is reported
/// but does not lose the result.
pub fn find_duplicates_cached<S: AsRef<str>>(
    folder: &Path,
    extensions: &[S],
    threshold: f64,
    cache: Option<&DuplicateCache>,
    refresh: bool,
    events: &EventSender,
) -> crate::Result<Vec<DuplicateGroup>> {
    let grouper = PerceptualHashGrouper::new(threshold)?;

    if let Some(cache) = cache {
        if !refresh {
            match cache.load() {
                Ok(Some(groups)) => {
                    events.info(format!(
                        "Loaded {} duplicate group(s) from {}",
                        groups.len(),
                        cache.path().display()
                    ));
                    return Ok(groups);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable duplicate cache");
                    events.error(e.to_string());
                }
            }
        }
    }

    let groups = grouper.find_in_folder(folder, extensions, events);

    if let Some(cache) = cache {
        match cache.save(&groups) {
            Ok(true) => {}
            Ok(false) => events.info(format!(
                "Duplicate cache not written: a path contains a comma or line break ({})",
                cache.path().display()
            )),
            Err(e) => {
                warn!(error = %e, "duplicate cache not saved");
                events.error(e.to_string());
            }
        }
    }

    Ok(groups)
}

//! Greedy single-pass clustering over perceptual fingerprints.

use super::DuplicateGroup;
use crate::core::hasher::{FingerprintHasher, PerceptualFingerprint};
use crate::core::scanner::FileDiscoverer;
use crate::error::{PhotoTriageError, ScanError};
use crate::events::{Event, EventSender, Progress};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Groups images whose fingerprint similarity meets a threshold
#[derive(Debug, Clone, Copy)]
pub struct PerceptualHashGrouper {
    threshold: f64,
}

impl PerceptualHashGrouper {
    /// `threshold` is a similarity in `[0, 1]`; 0.9 allows 6 differing bits
    pub fn new(threshold: f64) -> crate::Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PhotoTriageError::Config(format!(
                "similarity threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    /// The similarity a pair needs to be grouped
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Group the images of `folder` (top level only, sorted by path).
    ///
    /// A missing folder yields no groups.
    pub fn find_in_folder<S: AsRef<str>>(
        &self,
        folder: &Path,
        extensions: &[S],
        events: &EventSender,
    ) -> Vec<DuplicateGroup> {
        let files = match FileDiscoverer::new(extensions)
            .recursive(false)
            .discover(folder, events)
        {
            Ok(files) => files,
            Err(ScanError::DirectoryNotFound { .. }) | Err(ScanError::NotADirectory { .. }) => {
                events.info(format!("No folder to search at {}", folder.display()));
                return Vec::new();
            }
            Err(e) => {
                events.error(e.to_string());
                return Vec::new();
            }
        };

        self.group(&files, events)
    }

    /// Fingerprint `paths` and group them in the given order.
    ///
    /// Images that cannot be decoded are left out of every group.
    pub fn group(&self, paths: &[PathBuf], events: &EventSender) -> Vec<DuplicateGroup> {
        let mut hasher = FingerprintHasher::new();
        let total = paths.len();
        let mut fingerprints = Vec::with_capacity(total);

        for (index, path) in paths.iter().enumerate() {
            events.send(Event::Progress(Progress {
                completed: index + 1,
                total,
                current: path.clone(),
            }));

            match hasher.fingerprint_file(path) {
                Ok(fingerprint) => {
                    debug!(path = %path.display(), hash = %fingerprint, "fingerprinted");
                    fingerprints.push((path.clone(), fingerprint));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping image that failed to hash");
                    events.info(format!("Error hashing {}: {}", path.display(), e));
                }
            }
        }

        let groups = self.group_fingerprints(&fingerprints);
        info!(
            images = fingerprints.len(),
            groups = groups.len(),
            "duplicate grouping finished"
        );
        groups
    }

    /// Cluster already computed fingerprints
    pub fn group_fingerprints(&self, items: &[(PathBuf, PerceptualFingerprint)]) -> Vec<DuplicateGroup> {
        let mut claimed = vec![false; items.len()];
        let mut groups = Vec::new();

        for i in 0..items.len() {
            if claimed[i] {
                continue;
            }
            claimed[i] = true;
            let (seed_path, seed) = &items[i];
            let mut members = vec![seed_path.clone()];

            for j in (i + 1)..items.len() {
                if claimed[j] {
                    continue;
                }
                let (path, fingerprint) = &items[j];
                if seed.similarity(fingerprint) >= self.threshold {
                    claimed[j] = true;
                    members.push(path.clone());
                }
            }

            if members.len() > 1 {
                groups.push(DuplicateGroup::new(members));
            }
        }

        groups
    }
}

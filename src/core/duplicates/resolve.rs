//! Keep-the-largest resolution of duplicate groups.

use super::{DuplicateCache, DuplicateGroup};
use crate::error::FileOpError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened to one group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The file left in place; `None` only for an empty group
    pub kept: Option<PathBuf>,
    pub deleted: Vec<PathBuf>,
    /// Files that should have gone but could not be deleted
    pub failed: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// The member with the most bytes.
    ///
    /// Ties go to the earlier path and unreadable files never win, so a
    /// group whose sizes cannot be read keeps its first path.
    pub fn largest(&self) -> Option<&Path> {
        let mut best: Option<(&Path, u64)> = None;
        for path in &self.paths {
            let Ok(size) = fs::metadata(path).map(|m| m.len()) else {
                continue;
            };
            if best.map_or(true, |(_, best_size)| size > best_size) {
                best = Some((path.as_path(), size));
            }
        }
        best.map(|(path, _)| path)
            .or_else(|| self.paths.first().map(PathBuf::as_path))
    }
}

/// Keep the largest file of `group` and delete the others.
///
/// Each deletion, and each failed one, is a separate event.
pub fn resolve_keep_largest(group: &DuplicateGroup, events: &EventSender) -> Resolution {
    let Some(kept) = group.largest().map(Path::to_path_buf) else {
        return Resolution::default();
    };
    let mut resolution = Resolution {
        kept: Some(kept.clone()),
        ..Resolution::default()
    };
    if group.len() < 2 {
        events.info(format!("Only one image in this set: {}", kept.display()));
        return resolution;
    }

    for path in group.paths.iter().filter(|p| **p != kept) {
        match fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "deleted duplicate");
                events.info(format!("Deleted duplicate {}", path.display()));
                resolution.deleted.push(path.clone());
            }
            Err(e) => {
                let e = FileOpError::Delete {
                    path: path.clone(),
                    source: e,
                };
                warn!(error = %e, "duplicate not deleted");
                events.error(e.to_string());
                resolution.failed.push(path.clone());
            }
        }
    }

    events.info(format!(
        "Kept {}, deleted {} file(s)",
        kept.display(),
        resolution.deleted.len()
    ));
    resolution
}

/// Resolve every group, then drop `cache` since it now names deleted files
pub fn resolve_all_keep_largest(
    groups: &[DuplicateGroup],
    cache: Option<&DuplicateCache>,
    events: &EventSender,
) -> Vec<Resolution> {
    let resolutions = groups
        .iter()
        .map(|group| resolve_keep_largest(group, events))
        .collect();

    if let Some(cache) = cache {
        if let Err(e) = cache.invalidate() {
            warn!(error = %e, "duplicate cache not cleared");
            events.error(e.to_string());
        }
    }
    resolutions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{null_sender, Event, EventChannel};
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![7u8; len]).unwrap();
        path
    }

    #[test]
    fn largest_prefers_size_then_order() {
        let dir = TempDir::new().unwrap();
        let small = write(dir.path(), "a.jpg", 10);
        let big = write(dir.path(), "b.jpg", 30);
        let tie = write(dir.path(), "c.jpg", 30);

        let group = DuplicateGroup::new(vec![small, big.clone(), tie]);
        assert_eq!(group.largest(), Some(big.as_path()));
    }

    #[test]
    fn largest_falls_back_to_first_when_sizes_are_unreadable() {
        let group = DuplicateGroup::new(vec![PathBuf::from("/nonexistent/a.jpg"), PathBuf::from("/nonexistent/b.jpg")]);
        assert_eq!(group.largest(), Some(Path::new("/nonexistent/a.jpg")));
        assert_eq!(DuplicateGroup::new(Vec::new()).largest(), None);
    }

    #[test]
    fn keeps_largest_and_reports_each_deletion() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.jpg", 10);
        let b = write(dir.path(), "b.jpg", 50);
        let c = write(dir.path(), "c.jpg", 20);
        let group = DuplicateGroup::new(vec![a.clone(), b.clone(), c.clone()]);

        let (sender, receiver) = EventChannel::new();
        let resolution = resolve_keep_largest(&group, &sender);
        drop(sender);

        assert_eq!(resolution.kept, Some(b.clone()));
        assert_eq!(resolution.deleted, vec![a.clone(), c.clone()]);
        assert!(resolution.failed.is_empty());
        assert!(b.is_file());
        assert!(!a.exists() && !c.exists());

        let deletions = receiver
            .drain()
            .into_iter()
            .filter(|e| matches!(e, Event::Info(msg) if msg.starts_with("Deleted duplicate")))
            .count();
        assert_eq!(deletions, 2);
    }

    #[test]
    fn missing_member_is_a_failure_not_a_panic() {
        let dir = TempDir::new().unwrap();
        let kept = write(dir.path(), "a.jpg", 10);
        let gone = dir.path().join("gone.jpg");
        let group = DuplicateGroup::new(vec![kept.clone(), gone.clone()]);

        let (sender, receiver) = EventChannel::new();
        let resolution = resolve_keep_largest(&group, &sender);
        drop(sender);

        assert_eq!(resolution.kept, Some(kept));
        assert_eq!(resolution.failed, vec![gone]);
        assert!(receiver.drain().iter().any(|e| matches!(e, Event::Error(msg) if msg.contains("gone.jpg"))));
    }

    #[test]
    fn single_image_group_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let only = write(dir.path(), "a.jpg", 10);

        let resolution = resolve_keep_largest(&DuplicateGroup::new(vec![only.clone()]), &null_sender());

        assert_eq!(resolution.kept, Some(only.clone()));
        assert!(resolution.deleted.is_empty());
        assert!(only.is_file());
    }

    #[test]
    fn resolving_all_groups_clears_the_cache() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.jpg", 10);
        let b = write(dir.path(), "b.jpg", 20);
        let groups = vec![DuplicateGroup::new(vec![a, b.clone()])];
        let cache = DuplicateCache::new(dir.path().join("duplicate_cache.txt"));
        cache.save(&groups).unwrap();

        let resolutions = resolve_all_keep_largest(&groups, Some(&cache), &null_sender());

        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].kept, Some(b));
        assert!(!cache.path().exists());
    }
}

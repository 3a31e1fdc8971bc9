//! Extension matching for the scanner.

use crate::config::normalize_extension;
use std::collections::HashSet;
use std::path::Path;

/// Case-insensitive extension set
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    /// Lowercased extensions without the leading dot
    extensions: HashSet<String>,
}

impl ExtensionFilter {
    /// Build a filter; `.JPG`, `jpg` and `Jpg` all mean the same thing
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Check whether `path` carries one of the extensions
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    /// Number of distinct extensions
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// True when nothing can match
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_is_case_insensitive() {
        let filter = ExtensionFilter::new(&[".jpg"]);
        assert!(filter.matches(Path::new("/photos/image.jpg")));
        assert!(filter.matches(Path::new("/photos/image.JPG")));
        assert!(filter.matches(Path::new("/photos/image.Jpg")));
    }

    #[test]
    fn case_variants_collapse() {
        let filter = ExtensionFilter::new(&["jpg", ".JPG", "png"]);
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn filter_excludes_other_extensions() {
        let filter = ExtensionFilter::new(&["jpg", "png"]);
        assert!(!filter.matches(Path::new("/photos/document.pdf")));
        assert!(!filter.matches(Path::new("/photos/clip.mp4")));
    }

    #[test]
    fn filter_handles_no_extension() {
        let filter = ExtensionFilter::new(&["jpg"]);
        assert!(!filter.matches(Path::new("/photos/no_extension")));
        assert!(!filter.matches(Path::new("/photos/.jpg")));
    }

    #[test]
    fn empty_filter_matches_nothing() {
        let filter = ExtensionFilter::new::<&str>(&[]);
        assert!(filter.is_empty());
        assert!(!filter.matches(Path::new("a.jpg")));
    }
}

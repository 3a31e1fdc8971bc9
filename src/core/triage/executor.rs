//! Triage pipeline executor.

use super::{CancellationToken, TriageOutcome, TriageReport};
use crate::config::Config;
use crate::core::classifier::{BackgroundClassifier, ClassificationResult};
use crate::core::duplicates::DuplicateCache;
use crate::core::flatten::{DirectoryFlattener, FlattenOptions};
use crate::core::metadata;
use crate::core::paths;
use crate::core::scanner::{check_root, ExtensionFilter, FileDiscoverer};
use crate::error::Result;
use crate::events::{null_sender, Event, EventSender, Progress};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which destination a classified image goes to, and under what name
struct Decision {
    wanted: bool,
    filename: String,
}

/// Runs one triage pass over the configured import folder
pub struct TriagePipeline {
    config: Config,
    flatten_options: FlattenOptions,
}

impl TriagePipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            flatten_options: FlattenOptions::default(),
        }
    }

    /// Retry policy used when `flatten_import` is set
    pub fn flatten_options(mut self, options: FlattenOptions) -> Self {
        self.flatten_options = options;
        self
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run without events or cancellation
    pub fn run_silent(&self) -> Result<TriageReport> {
        self.run(&null_sender(), &CancellationToken::new())
    }

    /// Run the whole pipeline.
    ///
    /// Fails only when the configuration is invalid, the import folder is
    /// missing, or a destination folder cannot be created. The summary
    /// (`Event::Stats` then `Event::Complete`) is always sent on success.
    pub fn run(&self, events: &EventSender, cancel: &CancellationToken) -> Result<TriageReport> {
        let config = &self.config;
        config.validate()?;
        check_root(&config.import_path)?;

        info!(
            import = %config.import_path.display(),
            dry_run = config.dry_run,
            "triage started"
        );

        if config.dry_run {
            self.verbose(events, "Dry run: nothing will be moved.");
        } else {
            paths::ensure_dir(&config.wanted_path)?;
            paths::ensure_dir(&config.unwanted_path)?;
            self.invalidate_duplicate_cache(events);

            if config.flatten_import {
                DirectoryFlattener::new(self.flatten_options).flatten(&config.import_path, events)?;
            }
        }

        let mut report = TriageReport::default();
        if !config.dry_run {
            self.move_non_image_files(&mut report, events);
        }

        let images = FileDiscoverer::new(&config.supported_extensions).discover(&config.import_path, events)?;
        if images.is_empty() {
            self.verbose(events, "No image files found in Import folder.");
        } else {
            self.verbose(events, format!("Found {} image(s) to process.", images.len()));
        }

        let mut classifier = BackgroundClassifier::new(config.classifier_settings());
        let total = images.len();

        for (index, image) in images.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(processed = index, total, "triage cancelled");
                events.info("Processing cancelled.");
                report.cancelled = true;
                break;
            }

            events.send(Event::Progress(Progress {
                completed: index + 1,
                total,
                current: image.clone(),
            }));
            self.process_image(&mut classifier, image, &mut report, events);
        }

        info!(
            wanted = report.stats.wanted,
            unwanted = report.stats.unwanted,
            non_image = report.stats.non_image_files,
            errors = report.stats.errors,
            "triage finished"
        );
        events.send(Event::Stats(report.stats));
        events.send(Event::Complete(if report.cancelled {
            "Triage cancelled".to_string()
        } else {
            "Triage complete".to_string()
        }));

        Ok(report)
    }

    fn process_image(
        &self,
        classifier: &mut BackgroundClassifier,
        image: PathBuf,
        report: &mut TriageReport,
        events: &EventSender,
    ) {
        let name = file_name(&image);
        self.verbose(events, format!("Processing: {}", name));
        debug!(path = %image.display(), "classifying");

        let result = classifier.classify_file(&image);
        let decision = self.decide(&image, &name, &result, events);
        let outcome = if decision.wanted {
            TriageOutcome::Wanted
        } else {
            TriageOutcome::Unwanted
        };
        let folder = if decision.wanted {
            &self.config.wanted_path
        } else {
            &self.config.unwanted_path
        };
        let label = if decision.wanted { "Wanted" } else { "Unwanted" };
        let renamed = decision.filename != name;

        if self.config.dry_run {
            let mut message = format!("Would move {} to {}", name, label);
            if renamed {
                message.push_str(&format!(" as {}", decision.filename));
            }
            send_decision(events, decision.wanted, message);
            report.push(image, outcome, None);
            return;
        }

        match paths::move_into(&image, folder, &decision.filename) {
            Ok(dest) => {
                let mut message = format!("Moved {} to {}", name, label);
                if renamed || file_name(&dest) != decision.filename {
                    message.push_str(&format!(" as {}", file_name(&dest)));
                }
                send_decision(events, decision.wanted, message);
                report.push(image, outcome, Some(dest));
            }
            Err(e) => {
                warn!(path = %image.display(), error = %e, "move failed");
                events.error(format!("Error moving {}: {}", name, e));
                report.push(image, TriageOutcome::Error, None);
            }
        }
    }

    fn decide(&self, image: &Path, name: &str, result: &ClassificationResult, events: &EventSender) -> Decision {
        let keep_name = |wanted| Decision {
            wanted,
            filename: name.to_string(),
        };

        if let Some(error) = &result.error {
            warn!(path = %image.display(), error = %error, "classification failed");
            events.error(format!("{}: {} - Classifying as unwanted", name, error));
            return keep_name(false);
        }

        if result.is_white_dominant {
            self.verbose(
                events,
                format!("  White background: {:.1}% - Unwanted", result.white_percent),
            );
            return keep_name(false);
        }

        if !result.is_dark_dominant {
            self.verbose(
                events,
                format!(
                    "  White: {:.1}%, Dark: {:.1}% - Unwanted",
                    result.white_percent, result.dark_percent
                ),
            );
            return keep_name(false);
        }

        self.verbose(
            events,
            format!("  Dark background: {:.1}% - Wanted", result.dark_percent),
        );

        if !self.config.rename {
            self.verbose(events, "  Rename disabled - keeping original filename");
            return keep_name(true);
        }

        match metadata::capture_date_token(image) {
            Ok(date) => {
                self.verbose(events, format!("  EXIF date found: {}", date));
                Decision {
                    wanted: true,
                    filename: format!("{}_{}", date, name),
                }
            }
            Err(reason) => {
                self.verbose(events, format!("  No EXIF DateTimeOriginal: {}", reason));
                keep_name(true)
            }
        }
    }

    /// Move every non-image file directly in the import root to Wanted
    fn move_non_image_files(&self, report: &mut TriageReport, events: &EventSender) {
        let filter = ExtensionFilter::new(&self.config.supported_extensions);
        let import = &self.config.import_path;

        let mut candidates: Vec<PathBuf> = match fs::read_dir(import) {
            Ok(read) => read
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| !filter.matches(p))
                .collect(),
            Err(e) => {
                warn!(path = %import.display(), error = %e, "cannot list import folder");
                events.error(format!("Error moving non-image files: {}", e));
                return;
            }
        };
        candidates.sort();

        for source in candidates {
            let name = file_name(&source);
            match paths::move_into(&source, &self.config.wanted_path, &name) {
                Ok(dest) => {
                    self.verbose(events, format!("Moved non-image file: {} to Wanted", name));
                    report.push(source, TriageOutcome::NonImage, Some(dest));
                }
                Err(e) => {
                    warn!(path = %source.display(), error = %e, "non-image move failed");
                    events.error(format!("Error moving non-image file {}: {}", name, e));
                    report.push(source, TriageOutcome::Error, None);
                }
            }
        }
    }

    fn invalidate_duplicate_cache(&self, events: &EventSender) {
        let Some(path) = &self.config.duplicate_cache else {
            return;
        };
        match DuplicateCache::new(path).invalidate() {
            Ok(true) => self.verbose(events, "Duplicate cache cleared."),
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "duplicate cache not cleared");
                events.error(e.to_string());
            }
        }
    }

    /// Info event, dropped when `verbose` is off
    fn verbose(&self, events: &EventSender, message: impl Into<String>) {
        if self.config.verbose {
            events.info(message);
        }
    }
}

fn send_decision(events: &EventSender, wanted: bool, message: String) {
    events.send(if wanted {
        Event::WantedDecision(message)
    } else {
        Event::UnwantedDecision(message)
    });
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::test_support::write_jpeg;
    use crate::core::triage::Stats;
    use crate::error::{PhotoTriageError, ScanError};
    use crate::events::EventChannel;
    use image::{ImageBuffer, Rgb, RgbImage};
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        config: Config,
    }

    fn workspace() -> Workspace {
        let dir = TempDir::new().unwrap();
        let config = Config {
            import_path: dir.path().join("Import"),
            wanted_path: dir.path().join("Wanted"),
            unwanted_path: dir.path().join("Unwanted"),
            resize_size: 20,
            ..Config::default()
        };
        fs::create_dir(&config.import_path).unwrap();
        Workspace { _dir: dir, config }
    }

    fn solid(value: u8) -> RgbImage {
        ImageBuffer::from_pixel(20, 20, Rgb([value, value, value]))
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|read| read.filter_map(|e| e.ok()).map(|e| file_name(&e.path())).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn routes_white_dark_and_gray() {
        let ws = workspace();
        solid(250).save(ws.config.import_path.join("white.png")).unwrap();
        solid(10).save(ws.config.import_path.join("dark.png")).unwrap();
        solid(128).save(ws.config.import_path.join("gray.png")).unwrap();

        let report = TriagePipeline::new(ws.config.clone()).run_silent().unwrap();

        assert_eq!(
            report.stats,
            Stats {
                wanted: 1,
                unwanted: 2,
                non_image_files: 0,
                errors: 0
            }
        );
        assert_eq!(names(&ws.config.wanted_path), vec!["dark.png"]);
        assert_eq!(names(&ws.config.unwanted_path), vec!["gray.png", "white.png"]);
        assert!(names(&ws.config.import_path).is_empty());
    }

    #[test]
    fn dark_jpeg_with_exif_is_date_prefixed() {
        let ws = workspace();
        write_jpeg(
            &ws.config.import_path.join("photo2.jpg"),
            &solid(5),
            Some("2023:05:01 10:00:00"),
        );

        let report = TriagePipeline::new(ws.config.clone()).run_silent().unwrap();

        assert_eq!(report.stats.wanted, 1);
        assert_eq!(names(&ws.config.wanted_path), vec!["20230501_photo2.jpg"]);
        assert_eq!(
            report.records[0].destination,
            Some(ws.config.wanted_path.join("20230501_photo2.jpg"))
        );
    }

    #[test]
    fn rename_disabled_keeps_name() {
        let mut ws = workspace();
        ws.config.rename = false;
        write_jpeg(
            &ws.config.import_path.join("photo2.jpg"),
            &solid(5),
            Some("2023:05:01 10:00:00"),
        );

        TriagePipeline::new(ws.config.clone()).run_silent().unwrap();

        assert_eq!(names(&ws.config.wanted_path), vec!["photo2.jpg"]);
    }

    #[test]
    fn corrupt_image_goes_to_unwanted_without_error_count() {
        let ws = workspace();
        fs::write(ws.config.import_path.join("broken.jpg"), b"not a jpeg").unwrap();

        let (sender, receiver) = EventChannel::new();
        let report = TriagePipeline::new(ws.config.clone())
            .run(&sender, &CancellationToken::new())
            .unwrap();
        drop(sender);

        assert_eq!(report.stats.unwanted, 1);
        assert_eq!(report.stats.errors, 0);
        assert_eq!(names(&ws.config.unwanted_path), vec!["broken.jpg"]);
        assert!(receiver
            .drain()
            .iter()
            .any(|e| matches!(e, Event::Error(m) if m.contains("broken.jpg"))));
    }

    #[test]
    fn non_image_files_at_root_go_to_wanted() {
        let ws = workspace();
        fs::write(ws.config.import_path.join("notes.txt"), b"hi").unwrap();
        fs::create_dir(ws.config.import_path.join("sub")).unwrap();
        fs::write(ws.config.import_path.join("sub").join("deep.txt"), b"deep").unwrap();

        let report = TriagePipeline::new(ws.config.clone()).run_silent().unwrap();

        assert_eq!(report.stats.non_image_files, 1);
        assert_eq!(names(&ws.config.wanted_path), vec!["notes.txt"]);
        assert!(ws.config.import_path.join("sub").join("deep.txt").exists());
    }

    #[test]
    fn existing_destination_is_not_overwritten() {
        let ws = workspace();
        fs::create_dir(&ws.config.unwanted_path).unwrap();
        fs::write(ws.config.unwanted_path.join("white.png"), b"older").unwrap();
        solid(250).save(ws.config.import_path.join("white.png")).unwrap();

        TriagePipeline::new(ws.config.clone()).run_silent().unwrap();

        assert_eq!(names(&ws.config.unwanted_path), vec!["white.png", "white_1.png"]);
        assert_eq!(fs::read(ws.config.unwanted_path.join("white.png")).unwrap(), b"older");
    }

    #[test]
    fn nested_images_are_found() {
        let ws = workspace();
        let nested = ws.config.import_path.join("2023").join("May");
        fs::create_dir_all(&nested).unwrap();
        solid(10).save(nested.join("deep.png")).unwrap();

        let report = TriagePipeline::new(ws.config.clone()).run_silent().unwrap();

        assert_eq!(report.stats.wanted, 1);
        assert_eq!(names(&ws.config.wanted_path), vec!["deep.png"]);
    }

    #[test]
    fn flatten_import_runs_first() {
        let mut ws = workspace();
        ws.config.flatten_import = true;
        let nested = ws.config.import_path.join("album");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("readme.md"), b"#").unwrap();

        let report = TriagePipeline::new(ws.config.clone())
            .flatten_options(FlattenOptions {
                retries: 1,
                backoff: std::time::Duration::ZERO,
            })
            .run_silent()
            .unwrap();

        // Flattened to the root, so the non-image pass sees it
        assert_eq!(report.stats.non_image_files, 1);
        assert!(!nested.exists());
    }

    #[test]
    fn dry_run_moves_nothing() {
        let mut ws = workspace();
        ws.config.dry_run = true;
        solid(250).save(ws.config.import_path.join("white.png")).unwrap();
        solid(10).save(ws.config.import_path.join("dark.png")).unwrap();
        fs::write(ws.config.import_path.join("notes.txt"), b"hi").unwrap();

        let (sender, receiver) = EventChannel::new();
        let report = TriagePipeline::new(ws.config.clone())
            .run(&sender, &CancellationToken::new())
            .unwrap();
        drop(sender);

        assert_eq!(report.stats.wanted, 1);
        assert_eq!(report.stats.unwanted, 1);
        assert_eq!(report.stats.non_image_files, 0);
        assert!(report.records.iter().all(|r| r.destination.is_none()));
        assert!(!ws.config.wanted_path.exists());
        assert!(!ws.config.unwanted_path.exists());
        assert_eq!(names(&ws.config.import_path).len(), 3);
        assert!(receiver
            .drain()
            .iter()
            .any(|e| matches!(e, Event::WantedDecision(m) if m.starts_with("Would move dark.png"))));
    }

    #[test]
    fn cancelled_before_start_processes_nothing() {
        let ws = workspace();
        solid(10).save(ws.config.import_path.join("dark.png")).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let report = TriagePipeline::new(ws.config.clone())
            .run(&null_sender(), &token)
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.stats, Stats::default());
        assert!(ws.config.import_path.join("dark.png").exists());
    }

    #[test]
    fn missing_import_is_fatal_and_creates_nothing() {
        let ws = workspace();
        let mut config = ws.config.clone();
        config.import_path = config.import_path.join("missing");

        let result = TriagePipeline::new(config.clone()).run_silent();

        assert!(matches!(
            result,
            Err(PhotoTriageError::Scan(ScanError::DirectoryNotFound { .. }))
        ));
        assert!(!config.wanted_path.exists());
    }

    #[test]
    fn quiet_run_still_sends_summary() {
        let mut ws = workspace();
        ws.config.verbose = false;
        solid(10).save(ws.config.import_path.join("dark.png")).unwrap();

        let (sender, receiver) = EventChannel::new();
        TriagePipeline::new(ws.config.clone())
            .run(&sender, &CancellationToken::new())
            .unwrap();
        drop(sender);
        let events = receiver.drain();

        assert!(events.iter().all(|e| !matches!(e, Event::Info(_))));
        assert!(matches!(events[events.len() - 2], Event::Stats(s) if s.wanted == 1));
        assert!(matches!(events.last(), Some(Event::Complete(_))));
    }

    #[test]
    fn run_clears_duplicate_cache() {
        let mut ws = workspace();
        let cache = ws.config.wanted_path.with_file_name("duplicate_cache.txt");
        fs::write(&cache, "a,b\n").unwrap();
        ws.config.duplicate_cache = Some(cache.clone());

        TriagePipeline::new(ws.config.clone()).run_silent().unwrap();

        assert!(!cache.exists());
    }
}

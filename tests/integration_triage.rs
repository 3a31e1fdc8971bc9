//! Integration tests for the triage pipeline.
//!
//! These tests drive whole runs over a temporary Import/Wanted/Unwanted
//! layout:
//! - White and dark backgrounds, with EXIF renaming
//! - Corrupt images
//! - Dry runs and cancellation
//! - Flattening the import folder first

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageBuffer, Rgb, RgbImage};
use photo_triage::core::flatten::{DirectoryFlattener, FlattenOptions};
use photo_triage::core::triage::{CancellationToken, Stats, TriageOutcome, TriagePipeline};
use photo_triage::events::{null_sender, Event, EventChannel};
use photo_triage::{Config, PhotoTriageError};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const SIZE: u32 = 100;

fn layout() -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        import_path: dir.path().join("Import"),
        wanted_path: dir.path().join("Wanted"),
        unwanted_path: dir.path().join("Unwanted"),
        resize_size: SIZE,
        white_threshold_percent: 70.0,
        white_pixel_min: 240,
        dark_threshold_percent: 70.0,
        dark_pixel_max: 50,
        ..Config::default()
    };
    fs::create_dir(&config.import_path).unwrap();
    (dir, config)
}

/// `percent` of the rows in `fill`, the rest mid-gray
fn banded(percent: u32, fill: u8) -> RgbImage {
    let rows = SIZE * percent / 100;
    ImageBuffer::from_fn(SIZE, SIZE, |_, y| {
        if y < rows {
            Rgb([fill, fill, fill])
        } else {
            Rgb([128, 128, 128])
        }
    })
}

/// Minimal APP1 block: IFD0 -> Exif IFD -> DateTimeOriginal
fn exif_segment(datetime: &str) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM\x00\x2a");
    tiff.extend_from_slice(&8u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&[0x87, 0x69, 0x00, 0x04]);
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&26u32.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&1u16.to_be_bytes());
    tiff.extend_from_slice(&[0x90, 0x03, 0x00, 0x02]);
    tiff.extend_from_slice(&20u32.to_be_bytes());
    tiff.extend_from_slice(&44u32.to_be_bytes());
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(datetime.as_bytes());
    tiff.push(0);

    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&((8 + tiff.len()) as u16).to_be_bytes());
    segment.extend_from_slice(b"Exif\x00\x00");
    segment.extend_from_slice(&tiff);
    segment
}

fn write_jpeg(path: &Path, image: &RgbImage, datetime: Option<&str>) {
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, 95)
        .encode(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
        .unwrap();
    let bytes = match datetime {
        Some(datetime) => {
            let mut out = encoded[..2].to_vec();
            out.extend_from_slice(&exif_segment(datetime));
            out.extend_from_slice(&encoded[2..]);
            out
        }
        None => encoded,
    };
    fs::write(path, bytes).unwrap();
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn white_goes_unwanted_and_dark_is_renamed_into_wanted() {
    let (_dir, config) = layout();
    write_jpeg(&config.import_path.join("photo1.jpg"), &banded(98, 250), None);
    write_jpeg(
        &config.import_path.join("photo2.jpg"),
        &banded(90, 10),
        Some("2023:05:01 10:00:00"),
    );

    let report = TriagePipeline::new(config.clone()).run_silent().unwrap();

    assert_eq!(
        report.stats,
        Stats {
            wanted: 1,
            unwanted: 1,
            non_image_files: 0,
            errors: 0
        }
    );
    assert_eq!(listing(&config.unwanted_path), vec!["photo1.jpg"]);
    assert_eq!(listing(&config.wanted_path), vec!["20230501_photo2.jpg"]);
    assert!(listing(&config.import_path).is_empty());
}

#[test]
fn dark_jpeg_without_exif_keeps_its_name() {
    let (_dir, config) = layout();
    write_jpeg(&config.import_path.join("photo2.jpg"), &banded(90, 10), None);

    let report = TriagePipeline::new(config.clone()).run_silent().unwrap();

    assert_eq!(report.stats.wanted, 1);
    assert_eq!(listing(&config.wanted_path), vec!["photo2.jpg"]);
}

#[test]
fn corrupt_file_is_unwanted_not_an_error() {
    let (_dir, config) = layout();
    fs::write(config.import_path.join("broken.jpg"), b"this is not a valid image file").unwrap();

    let (sender, receiver) = EventChannel::new();
    let report = TriagePipeline::new(config.clone())
        .run(&sender, &CancellationToken::new())
        .unwrap();
    drop(sender);

    assert_eq!(report.stats.unwanted, 1);
    assert_eq!(report.stats.errors, 0);
    assert_eq!(report.records[0].outcome, TriageOutcome::Unwanted);
    assert_eq!(listing(&config.unwanted_path), vec!["broken.jpg"]);

    let events = receiver.drain();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Error(msg) if msg.contains("broken.jpg"))));
    assert!(matches!(events.last(), Some(Event::Complete(_))));
}

#[test]
fn every_file_gets_exactly_one_outcome() {
    let (_dir, config) = layout();
    write_jpeg(&config.import_path.join("a.jpg"), &banded(98, 250), None);
    write_jpeg(&config.import_path.join("b.JPG"), &banded(90, 10), None);
    banded(50, 10).save(config.import_path.join("c.png")).unwrap();
    fs::write(config.import_path.join("d.jpeg"), b"junk").unwrap();
    fs::write(config.import_path.join("e.txt"), b"notes").unwrap();

    let report = TriagePipeline::new(config.clone()).run_silent().unwrap();

    assert_eq!(report.records.len(), 5);
    assert_eq!(report.stats.total(), 5);
    assert_eq!(report.stats.non_image_files, 1);
    assert_eq!(listing(&config.wanted_path).len() + listing(&config.unwanted_path).len(), 5);
}

#[test]
fn dry_run_reports_but_leaves_everything_in_place() {
    let (_dir, mut config) = layout();
    config.dry_run = true;
    write_jpeg(&config.import_path.join("photo1.jpg"), &banded(98, 250), None);
    write_jpeg(
        &config.import_path.join("photo2.jpg"),
        &banded(90, 10),
        Some("2023:05:01 10:00:00"),
    );

    let (sender, receiver) = EventChannel::new();
    let report = TriagePipeline::new(config.clone())
        .run(&sender, &CancellationToken::new())
        .unwrap();
    drop(sender);

    assert_eq!(report.stats.wanted, 1);
    assert_eq!(report.stats.unwanted, 1);
    assert_eq!(listing(&config.import_path), vec!["photo1.jpg", "photo2.jpg"]);
    assert!(!config.wanted_path.exists());
    assert!(receiver.drain().iter().any(|e| matches!(
        e,
        Event::WantedDecision(msg) if msg.contains("as 20230501_photo2.jpg")
    )));
}

#[test]
fn cancellation_stops_between_files() {
    let (_dir, config) = layout();
    for name in ["a.png", "b.png", "c.png"] {
        banded(90, 10).save(config.import_path.join(name)).unwrap();
    }

    let token = CancellationToken::new();
    // Rendezvous channel: the pipeline cannot run ahead of the watcher
    let (sender, receiver) = EventChannel::bounded(0);
    let canceller = token.clone();
    let pipeline = TriagePipeline::new(config.clone());

    let watcher = std::thread::spawn(move || {
        for event in receiver.iter() {
            if let Event::Progress(p) = event {
                if p.completed == 1 {
                    canceller.cancel();
                }
            }
        }
    });
    let report = pipeline.run(&sender, &token).unwrap();
    drop(sender);
    watcher.join().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.stats.wanted, 1);
    assert_eq!(listing(&config.import_path).len(), 2);
    assert_eq!(listing(&config.wanted_path).len(), 1);
}

#[test]
fn flatten_then_triage_finds_nested_photos() {
    let (_dir, mut config) = layout();
    config.flatten_import = true;
    let nested = config.import_path.join("card").join("DCIM");
    fs::create_dir_all(&nested).unwrap();
    write_jpeg(&nested.join("shot.jpg"), &banded(90, 10), None);
    fs::write(nested.join("index.dat"), b"x").unwrap();

    let report = TriagePipeline::new(config.clone())
        .flatten_options(FlattenOptions {
            retries: 3,
            backoff: Duration::ZERO,
        })
        .run(&null_sender(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.stats.wanted, 1);
    assert_eq!(report.stats.non_image_files, 1);
    assert_eq!(listing(&config.wanted_path), vec!["index.dat", "shot.jpg"]);
    assert!(listing(&config.import_path).is_empty());
}

#[test]
fn missing_import_folder_aborts_before_any_work() {
    let (dir, mut config) = layout();
    config.import_path = dir.path().join("NoSuchFolder");

    let result = TriagePipeline::new(config.clone()).run_silent();

    assert!(matches!(result, Err(PhotoTriageError::Scan(_))));
    assert!(!config.wanted_path.exists());
    assert!(!config.unwanted_path.exists());
}

#[test]
fn flatten_round_trip_keeps_every_file() {
    let root = TempDir::new().unwrap();
    let deep = root.path().join("a").join("b").join("c");
    fs::create_dir_all(&deep).unwrap();
    fs::write(root.path().join("a").join("same.txt"), b"1").unwrap();
    fs::write(deep.join("same.txt"), b"2").unwrap();
    fs::write(deep.join("other.txt"), b"3").unwrap();

    let report = DirectoryFlattener::new(FlattenOptions {
        retries: 3,
        backoff: Duration::ZERO,
    })
    .flatten(root.path(), &null_sender())
    .unwrap();

    assert_eq!(report.files_moved, 3);
    assert_eq!(report.dirs_removed, 3);
    assert!(report.is_flat());
    assert_eq!(listing(root.path()), vec!["other.txt", "same.txt", "same_1.txt"]);

    let mut contents: Vec<Vec<u8>> = listing(root.path())
        .iter()
        .map(|name| fs::read(root.path().join(name)).unwrap())
        .collect();
    contents.sort();
    assert_eq!(contents, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
}

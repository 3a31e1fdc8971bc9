//! # CLI Module
//!
//! Command-line interface for the photo triage engine.
//!
//! ## Usage
//! ```bash
//! # List the images waiting in the import folder
//! photo-triage discover --import ./Import --details
//!
//! # Sort the import folder, flattening it first
//! photo-triage triage --import ./Import --flatten
//!
//! # Preview without moving anything
//! photo-triage triage --dry-run
//!
//! # Pull every nested file up into one folder
//! photo-triage flatten ./Import
//!
//! # Near-duplicates among the keepers, as JSON
//! photo-triage duplicates --folder ./Wanted --output json
//!
//! # Keep only the largest copy of each group
//! photo-triage duplicates --folder ./Wanted --keep-largest
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_triage::config::Config;
use photo_triage::core::duplicates::{
    find_duplicates_cached, resolve_all_keep_largest, DuplicateCache, DuplicateGroup, Resolution,
};
use photo_triage::core::flatten::{DirectoryFlattener, FlattenOptions, FlattenReport};
use photo_triage::core::scanner::{FileDiscoverer, ImageFile};
use photo_triage::core::triage::{CancellationToken, Stats, TriagePipeline};
use photo_triage::error::{PhotoTriageError, Result};
use photo_triage::events::{Event, EventChannel, EventReceiver, FlattenEvent};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Photo Triage - keep the dark-background shots, set aside the rest
#[derive(Parser, Debug)]
#[command(name = "photo-triage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the images triage would look at
    Discover {
        #[command(flatten)]
        common: CommonArgs,

        /// Show size, dimensions, capture date and camera per file
        #[arg(long)]
        details: bool,
    },

    /// Classify every image in the import folder and move it
    Triage {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        triage: TriageArgs,
    },

    /// Move every file of a nested folder into its root
    Flatten {
        /// Folder to flatten
        dir: PathBuf,
    },

    /// Group near-duplicate images in one folder
    Duplicates {
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Folder to search (defaults to the wanted folder)
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Minimum similarity, 0-1 (0.9 allows 6 of 64 bits to differ)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Flat file to reuse results from
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Ignore an existing cache and recompute
        #[arg(long)]
        refresh: bool,

        /// Keep the largest file of every group and delete the others
        #[arg(long)]
        keep_largest: bool,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Folder holding the photos to triage
    #[arg(long)]
    import: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TriageArgs {
    /// Destination for keepers
    #[arg(long)]
    wanted: Option<PathBuf>,

    /// Destination for rejects
    #[arg(long)]
    unwanted: Option<PathBuf>,

    /// Side of the square images are downsampled to
    #[arg(long)]
    resize: Option<u32>,

    /// Percent of white pixels above which an image is rejected
    #[arg(long)]
    white_threshold: Option<f64>,

    /// Channel floor for a white pixel (0-255)
    #[arg(long)]
    white_min: Option<u8>,

    /// Percent of dark pixels above which an image is kept
    #[arg(long)]
    dark_threshold: Option<f64>,

    /// Channel ceiling for a dark pixel (0-255)
    #[arg(long)]
    dark_max: Option<u8>,

    /// Keep original names instead of prefixing the EXIF date
    #[arg(long)]
    no_rename: bool,

    /// Flatten the import folder first
    #[arg(long)]
    flatten: bool,

    /// Report decisions without moving anything
    #[arg(long)]
    dry_run: bool,

    /// Only show errors and the summary
    #[arg(short, long)]
    quiet: bool,

    /// Duplicate cache to clear before files move
    #[arg(long)]
    duplicate_cache: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Discover { common, details } => run_discover(common, details),
        Commands::Triage { common, triage } => run_triage(common, triage),
        Commands::Flatten { dir } => run_flatten(&dir),
        Commands::Duplicates {
            config,
            folder,
            threshold,
            cache,
            refresh,
            keep_largest,
            output,
        } => run_duplicates(config, folder, threshold, cache, refresh, keep_largest, output),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_json_file(path),
        None => Ok(Config::default()),
    }
}

fn finish_config(config: Config) -> Result<Config> {
    let config = config.normalized();
    config.validate()?;
    Ok(config)
}

fn header(term: &Term, title: &str) {
    term.write_line(&format!(
        "{} {}",
        style(title).bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn run_discover(common: CommonArgs, details: bool) -> Result<()> {
    let mut config = load_config(common.config.as_deref())?;
    if let Some(import) = common.import {
        config.import_path = import;
    }
    let config = finish_config(config)?;

    let term = Term::stdout();
    let (sender, receiver) = EventChannel::new();
    let files = FileDiscoverer::new(&config.supported_extensions).discover(&config.import_path, &sender)?;
    drop(sender);
    for event in receiver.drain() {
        if let Event::Error(msg) = event {
            eprintln!("{} {}", style("✗").red(), msg);
        }
    }

    for path in &files {
        if !details {
            term.write_line(&display_path(path)).ok();
            continue;
        }
        let Ok(file) = ImageFile::from_path(path) else {
            term.write_line(&display_path(path)).ok();
            continue;
        };
        let meta = file.metadata();
        let dims = file
            .dimensions()
            .map(|(w, h)| format!("{}x{}", w, h))
            .or_else(|| meta.dimensions_display())
            .unwrap_or_else(|| "?".to_string());
        let date = file.capture_date().unwrap_or_else(|_| "-".to_string());
        let camera = meta.camera_display().unwrap_or_else(|| "-".to_string());

        term.write_line(&format!(
            "{}  {}  {}  {}  {}",
            display_path(path),
            style(format!("{:.2} MB", file.size_mb())).dim(),
            dims,
            style(date).cyan(),
            style(camera).dim()
        ))
        .ok();
    }

    term.write_line(&format!(
        "{} image(s) in {}",
        style(files.len()).cyan(),
        config.import_path.display()
    ))
    .ok();
    Ok(())
}

fn run_triage(common: CommonArgs, args: TriageArgs) -> Result<()> {
    let mut config = load_config(common.config.as_deref())?;
    if let Some(import) = common.import {
        config.import_path = import;
    }
    if let Some(wanted) = args.wanted {
        config.wanted_path = wanted;
    }
    if let Some(unwanted) = args.unwanted {
        config.unwanted_path = unwanted;
    }
    if let Some(size) = args.resize {
        config.resize_size = size;
    }
    if let Some(percent) = args.white_threshold {
        config.white_threshold_percent = percent;
    }
    if let Some(value) = args.white_min {
        config.white_pixel_min = value;
    }
    if let Some(percent) = args.dark_threshold {
        config.dark_threshold_percent = percent;
    }
    if let Some(value) = args.dark_max {
        config.dark_pixel_max = value;
    }
    if args.duplicate_cache.is_some() {
        config.duplicate_cache = args.duplicate_cache;
    }
    config.rename &= !args.no_rename;
    config.flatten_import |= args.flatten;
    config.dry_run |= args.dry_run;
    config.verbose &= !args.quiet;
    let config = finish_config(config)?;

    let term = Term::stderr();
    header(&term, "Photo Triage");

    let pipeline = TriagePipeline::new(config);
    let (sender, receiver) = EventChannel::new();
    let progress = progress_bar();
    let event_thread = spawn_renderer(receiver, progress.clone());

    let result = pipeline.run(&sender, &CancellationToken::new());
    drop(sender);
    let stats = event_thread.join().ok().flatten();
    progress.finish_and_clear();

    let report = result?;
    print_summary(&term, stats.unwrap_or(report.stats), pipeline.config().dry_run);
    Ok(())
}

fn run_flatten(dir: &Path) -> Result<()> {
    let term = Term::stderr();
    header(&term, "Flatten");

    let (sender, receiver) = EventChannel::new();
    let event_thread = spawn_renderer(receiver, ProgressBar::hidden());
    let result = DirectoryFlattener::new(FlattenOptions::default()).flatten(dir, &sender);
    drop(sender);
    event_thread.join().ok();

    let report = result?;
    print_flatten_summary(&term, &report);
    Ok(())
}

fn run_duplicates(
    config_path: Option<PathBuf>,
    folder: Option<PathBuf>,
    threshold: Option<f64>,
    cache_path: Option<PathBuf>,
    refresh: bool,
    keep_largest: bool,
    output: OutputFormat,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(threshold) = threshold {
        config.similarity_threshold = threshold;
    }
    if cache_path.is_some() {
        config.duplicate_cache = cache_path;
    }
    let config = finish_config(config)?;
    let folder = folder.unwrap_or_else(|| config.wanted_path.clone());
    let cache = config.duplicate_cache.as_ref().map(DuplicateCache::new);

    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);
    if pretty {
        header(&term, "Duplicate Finder");
    }

    let (sender, receiver) = EventChannel::new();
    let progress = if pretty { progress_bar() } else { ProgressBar::hidden() };
    let event_thread = spawn_renderer(receiver, progress.clone());

    let result = find_duplicates_cached(
        &folder,
        &config.supported_extensions,
        config.similarity_threshold,
        cache.as_ref(),
        refresh,
        &sender,
    )
    .map(|groups| {
        let resolutions = if keep_largest {
            resolve_all_keep_largest(&groups, cache.as_ref(), &sender)
        } else {
            Vec::new()
        };
        (groups, resolutions)
    });
    drop(sender);
    event_thread.join().ok();
    progress.finish_and_clear();

    let (groups, resolutions) = result?;
    match output {
        OutputFormat::Pretty => {
            print_pretty_groups(&term, &folder, &groups);
            if keep_largest {
                print_resolutions(&term, &resolutions);
            } else if !groups.is_empty() {
                term.write_line(&format!(
                    "{}",
                    style("No files were deleted. Review each group, or rerun with --keep-largest.").dim()
                ))
                .ok();
            }
        }
        OutputFormat::Json => {
            print_json_groups(&folder, config.similarity_threshold, &groups, &resolutions)?
        }
    }
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}

/// Render events on their own thread; yields the last `Stats` seen
fn spawn_renderer(receiver: EventReceiver, progress: ProgressBar) -> JoinHandle<Option<Stats>> {
    thread::spawn(move || {
        let mut stats = None;
        for event in receiver.iter() {
            match event {
                Event::Progress(p) => {
                    progress.set_length(p.total as u64);
                    progress.set_position(p.completed as u64);
                    progress.set_message(
                        p.current
                            .file_name()
                            .unwrap_or_default()
                            .to_string_lossy()
                            .into_owned(),
                    );
                }
                Event::Info(msg) => emit(&progress, style(msg).dim().to_string()),
                Event::WantedDecision(msg) => emit(&progress, format!("{} {}", style("✓").green(), msg)),
                Event::UnwantedDecision(msg) => {
                    emit(&progress, format!("{} {}", style("○").yellow(), msg))
                }
                Event::Error(msg) => emit(&progress, format!("{} {}", style("✗").red(), msg)),
                Event::Flatten(flatten) => {
                    let line = match &flatten {
                        FlattenEvent::MoveFailed { .. }
                        | FlattenEvent::RemoveRetryFailed { .. }
                        | FlattenEvent::ForceRemoveFailed { .. } => {
                            style(flatten.to_string()).red().to_string()
                        }
                        FlattenEvent::ForceRemoved { .. }
                        | FlattenEvent::Unreadable { .. }
                        | FlattenEvent::RemainingDirectory { .. } => {
                            style(flatten.to_string()).yellow().to_string()
                        }
                        _ => flatten.to_string(),
                    };
                    emit(&progress, line);
                }
                Event::Stats(s) => stats = Some(s),
                Event::Complete(_) => progress.finish_and_clear(),
            }
        }
        stats
    })
}

/// Print above the bar, or straight to stderr when there is no bar to draw
fn emit(progress: &ProgressBar, line: String) {
    if progress.is_hidden() {
        eprintln!("{}", line);
    } else {
        progress.println(line);
    }
}

fn print_summary(term: &Term, stats: Stats, dry_run: bool) {
    let rule = "=".repeat(60);
    term.write_line("").ok();
    term.write_line(&rule).ok();
    term.write_line(&format!(
        "{}{}",
        style("Processing Summary").bold(),
        if dry_run { " (dry run)" } else { "" }
    ))
    .ok();
    term.write_line(&format!("  Wanted:          {}", style(stats.wanted).green())).ok();
    term.write_line(&format!("  Unwanted:        {}", style(stats.unwanted).yellow())).ok();
    term.write_line(&format!("  Non-image files: {}", style(stats.non_image_files).cyan())).ok();
    term.write_line(&format!("  Errors:          {}", style(stats.errors).red())).ok();
    term.write_line(&rule).ok();
}

fn print_flatten_summary(term: &Term, report: &FlattenReport) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} {} files moved, {} dirs removed",
        style("✓").green().bold(),
        style(report.files_moved).cyan(),
        style(report.dirs_removed).cyan()
    ))
    .ok();
    if report.errors > 0 {
        term.write_line(&format!("  {} files could not be moved", style(report.errors).red()))
            .ok();
    }
    if report.is_flat() {
        term.write_line("  Fully flattened: no subdirectories left").ok();
    } else {
        for dir in &report.remaining {
            term.write_line(&format!("  {} {}", style("left:").yellow(), display_path(dir)))
                .ok();
        }
    }
}

fn print_pretty_groups(term: &Term, folder: &Path, groups: &[DuplicateGroup]) {
    term.write_line("").ok();
    if groups.is_empty() {
        term.write_line(&format!(
            "  {} No duplicates found in {}",
            style("✓").green(),
            display_path(folder)
        ))
        .ok();
        return;
    }

    term.write_line(&format!(
        "{}",
        style("Duplicate Groups:").bold().underlined()
    ))
    .ok();
    term.write_line("").ok();

    for (i, group) in groups.iter().enumerate() {
        term.write_line(&format!(
            "  {} ({} images)",
            style(format!("Group {}:", i + 1)).bold(),
            group.len()
        ))
        .ok();
        for (idx, path) in group.paths.iter().enumerate() {
            let marker = if idx == 0 {
                style("★").green().to_string()
            } else {
                style("○").dim().to_string()
            };
            term.write_line(&format!("    {} {}", marker, display_path(path)))
                .ok();
        }
        term.write_line("").ok();
    }
}

fn print_resolutions(term: &Term, resolutions: &[Resolution]) {
    let deleted: usize = resolutions.iter().map(|r| r.deleted.len()).sum();
    let failed: usize = resolutions.iter().map(|r| r.failed.len()).sum();
    term.write_line(&format!(
        "{} Kept the largest of {} group(s), deleted {} file(s)",
        style("✓").green().bold(),
        style(resolutions.len()).cyan(),
        style(deleted).cyan()
    ))
    .ok();
    if failed > 0 {
        term.write_line(&format!("  {} files could not be deleted", style(failed).red()))
            .ok();
    }
}

fn print_json_groups(
    folder: &Path,
    threshold: f64,
    groups: &[DuplicateGroup],
    resolutions: &[Resolution],
) -> Result<()> {
    let output = serde_json::json!({
        "folder": folder,
        "threshold": threshold,
        "duplicate_groups": groups.len(),
        "groups": groups.iter().map(|g| &g.paths).collect::<Vec<_>>(),
        "resolutions": resolutions,
    });
    let text = serde_json::to_string_pretty(&output)
        .map_err(|e| PhotoTriageError::Config(format!("cannot render JSON: {}", e)))?;
    println!("{}", text);
    Ok(())
}

/// Shorten paths under the home directory to `~/...`
fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

//! # Photo Triage
//!
//! Sorts a folder of freshly imported photos into "wanted" and "unwanted"
//! buckets and finds near-duplicates among the keepers.
//!
//! ## Core Philosophy
//! - **Triage moves, never deletes** - Every photo ends up in exactly one bucket;
//!   only an explicit keep-largest pass removes duplicates
//! - **Never overwrite** - Name clashes get a numeric suffix instead
//! - **Keep going** - One broken file never stops a run
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - Discovery, classification, relocation and duplicate grouping
//! - `config` - The per-run configuration record
//! - `events` - Event-driven progress reporting
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface (binary only)

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::{PhotoTriageError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}

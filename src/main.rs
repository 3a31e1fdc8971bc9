//! # photo-triage CLI
//!
//! Command-line interface for the photo triage engine.
//!
//! ## Usage
//! ```bash
//! photo-triage triage --import ./Import --wanted ./Wanted --unwanted ./Unwanted
//! photo-triage duplicates --folder ./Wanted --threshold 0.9
//! photo-triage flatten ./Import
//! ```

mod cli;

use photo_triage::Result;

fn main() -> Result<()> {
    photo_triage::init_tracing();
    cli::run()
}

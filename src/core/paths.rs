//! Conflict-free destination naming and file moves.
//!
//! Every component that writes into a folder goes through
//! [`resolve_destination`] so an existing file is never overwritten.

use crate::error::FileOpError;
use std::fs::{self, File, FileTimes, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Return a path inside `dir` for `filename` that does not exist yet.
///
/// Clashes get `_1`, `_2`, ... inserted before the extension
/// (`photo.jpg` -> `photo_1.jpg`). The directory is checked on every call,
/// so two calls can disagree if someone else writes in between.
pub fn resolve_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !occupied(&candidate) {
        return candidate;
    }

    let (stem, ext) = split_name(filename);
    let mut counter = 1u32;
    loop {
        let name = match ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = dir.join(name);
        if !occupied(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Anything at `path`, dangling symlinks included
fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Split on the last dot; a leading dot belongs to the stem (`.env` has no extension)
fn split_name(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(0) | None => (filename, None),
        Some(idx) => (&filename[..idx], Some(&filename[idx + 1..])),
    }
}

/// Move `source` to `dest`.
///
/// Tries a rename first. Renames fail across filesystems, so the fallback
/// copies, checks the copy has the source's size, carries over the access
/// and modify times, then deletes the source. When the fallback fails
/// after copying, the copy is deleted again so the file exists only at
/// `source`.
pub fn move_file(source: &Path, dest: &Path) -> Result<(), FileOpError> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    copy_then_remove(source, dest).map_err(|e| FileOpError::Move {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: e,
    })
}

fn copy_then_remove(source: &Path, dest: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    fs::copy(source, dest)?;
    discard_copy_on_error(dest, verify_size(dest, metadata.len()))?;

    if let Err(e) = times_of(&metadata)
        .map_err(|e| timestamps_error(dest, e))
        .and_then(|times| restore_times(dest, times))
    {
        warn!(error = %e, "copied file keeps fresh timestamps");
    }

    discard_copy_on_error(dest, fs::remove_file(source))
}

fn verify_size(dest: &Path, expected: u64) -> io::Result<()> {
    let actual = fs::metadata(dest)?.len();
    if actual != expected {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "Copy verification failed: source {} bytes, dest {} bytes",
                expected, actual
            ),
        ));
    }
    Ok(())
}

/// Delete the copy at `dest` when `step` failed
fn discard_copy_on_error(dest: &Path, step: io::Result<()>) -> io::Result<()> {
    if step.is_err() {
        let _ = fs::remove_file(dest);
    }
    step
}

/// Access and modify times of `path`, for [`restore_times`] after a move
pub fn read_times(path: &Path) -> Result<FileTimes, FileOpError> {
    fs::metadata(path)
        .and_then(|m| times_of(&m))
        .map_err(|e| timestamps_error(path, e))
}

/// Put `times` back on `path`
pub fn restore_times(path: &Path, times: FileTimes) -> Result<(), FileOpError> {
    File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_times(times))
        .map_err(|e| timestamps_error(path, e))
}

fn times_of(metadata: &Metadata) -> io::Result<FileTimes> {
    Ok(FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?))
}

fn timestamps_error(path: &Path, source: io::Error) -> FileOpError {
    FileOpError::Timestamps {
        path: path.to_path_buf(),
        source,
    }
}

/// Move `source` into `dir` under `filename`, renaming on conflict.
///
/// Returns where the file ended up.
pub fn move_into(source: &Path, dir: &Path, filename: &str) -> Result<PathBuf, FileOpError> {
    let dest = resolve_destination(dir, filename);
    move_file(source, &dest)?;
    Ok(dest)
}

/// Create `dir` (and parents) if missing
pub fn ensure_dir(dir: &Path) -> Result<(), FileOpError> {
    fs::create_dir_all(dir).map_err(|e| FileOpError::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })
}

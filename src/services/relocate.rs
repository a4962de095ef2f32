//! Moving qualifying archives into the destination directory.
//!
//! Existing files are never overwritten: a colliding name gets a `_1`, `_2`,
//! ... suffix before the extension. Names are claimed atomically (hard link
//! or exclusive create), so a file that appears at the destination while we
//! move is kept as well.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::FilesystemError;

/// Numbered names tried before falling back to a random suffix
const MAX_NUMBERED_NAMES: usize = 1000;

enum MoveError {
    /// Something already exists at the destination
    Taken,
    Io(io::Error),
}

/// Move `source` to `destination_dir/name`, returning the final path
pub fn relocate(source: &Path, destination_dir: &Path, name: &str) -> Result<PathBuf, FilesystemError> {
    if !destination_dir.exists() {
        fs::create_dir_all(destination_dir).map_err(|e| FilesystemError::CreateDir {
            path: destination_dir.to_path_buf(),
            source: e,
        })?;
    }

    let wanted = destination_dir.join(name);
    let move_error = |to: &Path, e: io::Error| FilesystemError::Move {
        from: source.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };

    for destination in candidate_names(&wanted) {
        match perform_move(source, &destination) {
            Ok(()) => {
                if destination != wanted {
                    tracing::info!(
                        wanted = %wanted.display(),
                        using = %destination.display(),
                        "Destination exists, renaming"
                    );
                }
                return Ok(destination);
            }
            Err(MoveError::Taken) => continue,
            Err(MoveError::Io(e)) => return Err(move_error(&destination, e)),
        }
    }

    Err(move_error(
        &wanted,
        io::Error::new(ErrorKind::AlreadyExists, "no free destination name"),
    ))
}

/// `wanted`, then `stem_1.ext` .. `stem_1000.ext`, then a uuid suffix
fn candidate_names(wanted: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    let parent = wanted.parent().unwrap_or(Path::new("."));
    let stem = wanted
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = wanted
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let numbered = (1..=MAX_NUMBERED_NAMES).map({
        let (stem, ext) = (stem.clone(), ext.clone());
        move |n| parent.join(format!("{}_{}{}", stem, n, ext))
    });
    let random = std::iter::once_with(move || {
        parent.join(format!("{}_{}{}", stem, uuid::Uuid::new_v4(), ext))
    });

    std::iter::once(wanted.to_path_buf()).chain(numbered).chain(random)
}

/// Link then unlink when possible, exclusive copy + delete otherwise
/// (other filesystems, no hard link support). On failure the source stays
/// where it was and nothing we did not create is touched.
fn perform_move(source: &Path, destination: &Path) -> Result<(), MoveError> {
    match fs::hard_link(source, destination) {
        Ok(()) => return remove_source(source, destination),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(MoveError::Taken),
        Err(e) if !source.exists() => return Err(MoveError::Io(e)),
        Err(e) => {
            tracing::debug!(error = %e, "Hard link failed, falling back to copy");
        }
    }

    copy_exclusive(source, destination)?;
    remove_source(source, destination)
}

fn copy_exclusive(source: &Path, destination: &Path) -> Result<(), MoveError> {
    let mut reader = File::open(source).map_err(MoveError::Io)?;
    let mut writer = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(MoveError::Taken),
        Err(e) => return Err(MoveError::Io(e)),
    };

    if let Err(e) = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all()) {
        // Ours, created above: don't leave a truncated copy behind
        drop(writer);
        let _ = fs::remove_file(destination);
        return Err(MoveError::Io(e));
    }
    Ok(())
}

fn remove_source(source: &Path, destination: &Path) -> Result<(), MoveError> {
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(destination);
        return Err(MoveError::Io(e));
    }
    Ok(())
}

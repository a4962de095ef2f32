use std::path::PathBuf;
use thiserror::Error;

use crate::actions::status::ActionStatus;

/// Problems detected while building the host or an action's configuration.
/// These are the only errors surfaced synchronously to callers.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("action already registered: {0}")]
    DuplicateName(String),

    #[error("{field} is required and could not be determined")]
    MissingDirectory { field: &'static str },

    #[error("image ratio threshold must be within (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error(
        "destination {} lies inside the watched source {}",
        destination_dir.display(),
        source_dir.display()
    )]
    NestedDestination {
        source_dir: PathBuf,
        destination_dir: PathBuf,
    },
}

/// A candidate archive that does not qualify for relocation.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive {} has no entries", path.display())]
    Empty { path: PathBuf },

    #[error(
        "archive {} is not an image archive, image ratio too low ({images}/{total} = {ratio:.2})",
        path.display()
    )]
    BelowThreshold {
        path: PathBuf,
        images: usize,
        total: usize,
        ratio: f64,
    },
}

/// Metadata entry problems. Never fatal: the original file name is kept.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read {entry}: {reason}")]
    Read { entry: String, reason: String },

    #[error("failed to parse {entry}: {reason}")]
    Parse { entry: String, reason: String },

    #[error("{entry} has no gallery_info.source.gid")]
    MissingIdentifier { entry: String },

    #[error("{entry} identifier {value:?} cannot be used as a file name")]
    InvalidIdentifier { entry: String, value: String },
}

/// Failures while relocating a qualifying archive.
#[derive(Debug, Error)]
pub enum FilesystemError {
    #[error("failed to create destination directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: ActionStatus, to: ActionStatus },
}

/// Errors returned by an action's activate/deactivate logic.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("source directory does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("action is already running")]
    AlreadyRunning,
}

//! Watch-classify-relocate pipeline
//!
//! [`ArchiveMover`] processes one [`WatchEvent`] at a time on the owning
//! action's execution context:
//!
//! 1. dedup on the canonical path (recorded before any work, whatever the outcome)
//! 2. drop anything without the archive extension, silently
//! 3. classify the archive by image ratio; reject empty, corrupt or text-heavy ones
//! 4. derive the destination name from the metadata entry, falling back to the
//!    original name with a warning
//! 5. move, never overwriting an existing file
//!
//! Every failure is turned into a report; nothing here can end the action loop.

use std::path::{Path, PathBuf};

use super::classifier::{self, InspectedArchive};
use super::dedup::{self, ProcessedSet};
use super::metadata;
use super::relocate;
use super::watcher::WatchEvent;
use crate::actions::status::ActionStatus;
use crate::actions::ActionContext;
use crate::config::ArchiveMoverConfig;
use crate::error::{ArchiveError, FilesystemError};

/// What happened to one delivered event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Path was already attempted
    Duplicate,
    /// Not an archive
    Ignored,
    /// Archive did not qualify; file untouched
    Rejected,
    /// Moved to the contained path
    Moved(PathBuf),
    /// Qualifying archive that could not be moved; file untouched
    MoveFailed,
}

enum PipelineError {
    Archive(ArchiveError),
    Filesystem(FilesystemError),
}

impl From<ArchiveError> for PipelineError {
    fn from(e: ArchiveError) -> Self {
        PipelineError::Archive(e)
    }
}

impl From<FilesystemError> for PipelineError {
    fn from(e: FilesystemError) -> Self {
        PipelineError::Filesystem(e)
    }
}

pub struct ArchiveMover {
    config: ArchiveMoverConfig,
    processed: ProcessedSet,
}

impl ArchiveMover {
    pub fn new(config: ArchiveMoverConfig) -> Self {
        Self {
            config,
            processed: ProcessedSet::new(),
        }
    }

    pub fn config(&self) -> &ArchiveMoverConfig {
        &self.config
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Process one event end to end, reporting through `ctx`
    pub fn handle_event(&mut self, event: &WatchEvent, ctx: &ActionContext) -> EventOutcome {
        let path = dedup::canonical_path(&event.path);

        if self.config.dedup && !self.processed.insert(&path) {
            tracing::debug!(path = %path.display(), kind = ?event.kind, "Already processed, skipping");
            return EventOutcome::Duplicate;
        }

        if !classifier::has_extension(&path, &self.config.archive_extension) {
            return EventOutcome::Ignored;
        }

        ctx.begin_work();

        match self.process_archive(&path, ctx) {
            Ok(destination) => {
                ctx.info(&format!(
                    "moved {} to {}",
                    path.display(),
                    destination.display()
                ));
                ctx.finish_work(ActionStatus::Success);
                EventOutcome::Moved(destination)
            }
            Err(PipelineError::Archive(e)) => {
                ctx.error(&e.to_string());
                ctx.finish_work(ActionStatus::Failure);
                EventOutcome::Rejected
            }
            Err(PipelineError::Filesystem(e)) => {
                ctx.error(&e.to_string());
                ctx.finish_work(ActionStatus::Failure);
                EventOutcome::MoveFailed
            }
        }
    }

    fn process_archive(&self, path: &Path, ctx: &ActionContext) -> Result<PathBuf, PipelineError> {
        // The archive handle must be closed before the file is moved
        let name = {
            let mut archive = InspectedArchive::open(path, &self.config)?;
            archive.ensure_qualifies(self.config.image_ratio_threshold)?;
            self.destination_name(path, &mut archive, ctx)
        };

        let destination = relocate::relocate(path, &self.config.destination_dir, &name)?;
        Ok(destination)
    }

    /// Name from the metadata identifier, or the original file name
    fn destination_name(&self, path: &Path, archive: &mut InspectedArchive, ctx: &ActionContext) -> String {
        let original = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let entry = &self.config.metadata_entry;

        let identifier = match archive.read_metadata() {
            None => {
                ctx.warn(&format!(
                    "archive {} is missing metadata ({}), keeping original name",
                    path.display(),
                    entry
                ));
                return original;
            }
            Some(bytes) => bytes.and_then(|bytes| metadata::gallery_identifier(&bytes, entry)),
        };

        match identifier {
            Ok(identifier) => metadata::destination_name(&identifier, path),
            Err(e) => {
                ctx.warn(&format!(
                    "archive {}: {}, keeping original name",
                    path.display(),
                    e
                ));
                original
            }
        }
    }
}

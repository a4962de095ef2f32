//! Archive classification
//!
//! Decides whether a zip archive is an image gallery by the share of its
//! entries that carry an image extension, and locates the metadata entry.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::config::ArchiveMoverConfig;
use crate::error::{ArchiveError, MetadataError};

/// Upper bound on the metadata entry size we are willing to read
const MAX_METADATA_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveClassification {
    pub total_entries: usize,
    pub image_entries: usize,
    pub has_metadata: bool,
}

impl ArchiveClassification {
    pub fn image_ratio(&self) -> f64 {
        if self.total_entries == 0 {
            return 0.0;
        }
        self.image_entries as f64 / self.total_entries as f64
    }
}

/// Case-insensitive extension check
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// An opened archive plus what its entry listing told us
pub struct InspectedArchive {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    classification: ArchiveClassification,
    /// Actual (case-preserved) name of the metadata entry
    metadata_name: Option<String>,
}

impl InspectedArchive {
    /// Open `path` as a zip container and classify its entries
    pub fn open(path: &Path, config: &ArchiveMoverConfig) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| ArchiveError::Open {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut image_entries = 0;
        let mut metadata_name = None;
        for name in archive.file_names() {
            let lower = name.to_lowercase();
            if lower == config.metadata_entry {
                metadata_name = Some(name.to_string());
            }
            let is_image = config
                .image_extensions
                .iter()
                .any(|ext| has_extension(Path::new(&lower), ext));
            if is_image {
                image_entries += 1;
            }
        }

        let classification = ArchiveClassification {
            total_entries: archive.len(),
            image_entries,
            has_metadata: metadata_name.is_some(),
        };

        tracing::debug!(
            path = %path.display(),
            total = classification.total_entries,
            images = classification.image_entries,
            has_metadata = classification.has_metadata,
            "Classified archive"
        );

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            classification,
            metadata_name,
        })
    }

    pub fn classification(&self) -> ArchiveClassification {
        self.classification
    }

    /// Reject empty archives and archives below the image ratio threshold
    pub fn ensure_qualifies(&self, threshold: f64) -> Result<(), ArchiveError> {
        let c = self.classification;
        if c.total_entries == 0 {
            return Err(ArchiveError::Empty {
                path: self.path.clone(),
            });
        }

        let ratio = c.image_ratio();
        if ratio < threshold {
            return Err(ArchiveError::BelowThreshold {
                path: self.path.clone(),
                images: c.image_entries,
                total: c.total_entries,
                ratio,
            });
        }

        Ok(())
    }

    /// Raw bytes of the metadata entry, `None` when the archive has none
    pub fn read_metadata(&mut self) -> Option<Result<Vec<u8>, MetadataError>> {
        let name = self.metadata_name.clone()?;
        Some(self.read_entry(&name))
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, MetadataError> {
        let read_error = |reason: String| MetadataError::Read {
            entry: name.to_string(),
            reason,
        };

        let entry = self
            .archive
            .by_name(name)
            .map_err(|e| read_error(e.to_string()))?;

        if entry.size() > MAX_METADATA_BYTES {
            return Err(read_error(format!(
                "entry is {} bytes, limit is {}",
                entry.size(),
                MAX_METADATA_BYTES
            )));
        }

        let mut buffer = Vec::with_capacity(entry.size() as usize);
        entry
            .take(MAX_METADATA_BYTES)
            .read_to_end(&mut buffer)
            .map_err(|e| read_error(e.to_string()))?;
        Ok(buffer)
    }
}

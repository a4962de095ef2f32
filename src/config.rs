//! Static configuration for the host and its actions.
//!
//! Values come from CLI flags / environment; nothing is persisted. Each
//! action kind validates its configuration once, at construction.

use std::path::PathBuf;

use crate::error::ConfigurationError;
use crate::services::dedup::canonical_path;

/// Default share of image entries an archive needs to qualify
pub const DEFAULT_IMAGE_RATIO_THRESHOLD: f64 = 0.5;

pub const DEFAULT_ARCHIVE_EXTENSION: &str = "zip";

pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub const DEFAULT_METADATA_ENTRY: &str = "info.json";

/// Folder created under the user's pictures directory by default
const DEFAULT_DESTINATION_FOLDER: &str = "Galleries";

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub name: String,
    pub description: String,
    pub icon: PathBuf,
    /// Forward reports to the control surface as toasts
    pub notify: bool,
    /// Start every action when the control loop starts
    pub auto_start: bool,
}

impl HostConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Action host {}", name),
            icon: PathBuf::from("robot.ico"),
            notify: false,
            auto_start: true,
        }
    }
}

/// Configuration of the archive mover action
#[derive(Debug, Clone)]
pub struct ArchiveMoverConfig {
    /// Directory watched recursively
    pub source_dir: PathBuf,
    /// Where qualifying archives are moved
    pub destination_dir: PathBuf,
    /// Attempt each path at most once per action instance
    pub dedup: bool,
    /// Extension (without dot) of archives to inspect
    pub archive_extension: String,
    /// Extensions (without dot) counted as images
    pub image_extensions: Vec<String>,
    /// Archive entry carrying gallery metadata
    pub metadata_entry: String,
    pub image_ratio_threshold: f64,
}

impl ArchiveMoverConfig {
    pub fn new(source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            dedup: true,
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            image_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            metadata_entry: DEFAULT_METADATA_ENTRY.to_string(),
            image_ratio_threshold: DEFAULT_IMAGE_RATIO_THRESHOLD,
        }
    }

    /// Default source directory: the platform downloads folder
    pub fn default_source_dir() -> Option<PathBuf> {
        dirs::download_dir().or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
    }

    /// Default destination directory: a folder under the platform pictures folder
    pub fn default_destination_dir() -> Option<PathBuf> {
        dirs::picture_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
            .map(|pictures| pictures.join(DEFAULT_DESTINATION_FOLDER))
    }

    /// Check and normalize the configuration.
    ///
    /// Extensions are lowercased and stripped of a leading dot; the metadata
    /// entry name is lowercased since entries are compared case-insensitively.
    pub fn validated(mut self) -> Result<Self, ConfigurationError> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::MissingDirectory {
                field: "source_dir",
            });
        }
        if self.destination_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::MissingDirectory {
                field: "destination_dir",
            });
        }

        // The watch is recursive: a destination under the source would feed
        // every moved archive back into the pipeline
        let source_dir = canonical_path(&self.source_dir);
        let destination_dir = canonical_path(&self.destination_dir);
        if destination_dir.starts_with(&source_dir) {
            return Err(ConfigurationError::NestedDestination {
                source_dir,
                destination_dir,
            });
        }

        let threshold = self.image_ratio_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigurationError::InvalidThreshold(threshold));
        }

        self.archive_extension = normalize_extension(&self.archive_extension);
        if self.archive_extension.is_empty() {
            return Err(ConfigurationError::EmptyField("archive_extension"));
        }

        self.image_extensions = self
            .image_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();
        if self.image_extensions.is_empty() {
            return Err(ConfigurationError::EmptyField("image_extensions"));
        }

        self.metadata_entry = self.metadata_entry.trim().to_lowercase();
        if self.metadata_entry.is_empty() {
            return Err(ConfigurationError::EmptyField("metadata_entry"));
        }

        Ok(self)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

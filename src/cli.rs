use clap::Parser;
use std::path::PathBuf;

use crate::actions::archive_mover::DEFAULT_NAME;
use crate::config::{ArchiveMoverConfig, HostConfig, DEFAULT_IMAGE_RATIO_THRESHOLD};
use crate::error::ConfigurationError;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "archive-mover",
    about = "Watches a download folder and files image archives into a gallery folder",
    version
)]
pub struct Cli {
    /// Directory to watch (default: the user's downloads folder)
    #[arg(long, short = 's', env = "ARCHIVE_MOVER_SRC_DIR")]
    pub src_dir: Option<PathBuf>,

    /// Where qualifying archives go (default: Galleries under the user's pictures folder)
    #[arg(long, short = 'd', env = "ARCHIVE_MOVER_DST_DIR")]
    pub dst_dir: Option<PathBuf>,

    /// Echo every report as a toast on the control surface
    #[arg(long, env = "ARCHIVE_MOVER_NOTIFY")]
    pub notify: bool,

    /// Re-process paths that were already attempted
    #[arg(long, env = "ARCHIVE_MOVER_NO_DEDUP")]
    pub no_dedup: bool,

    /// Minimum share of image entries for an archive to qualify
    #[arg(long, env = "ARCHIVE_MOVER_THRESHOLD", default_value_t = DEFAULT_IMAGE_RATIO_THRESHOLD)]
    pub threshold: f64,

    /// Wait for an explicit `start` instead of starting every action
    #[arg(long, env = "ARCHIVE_MOVER_NO_AUTO_START")]
    pub no_auto_start: bool,

    /// Host name shown on the control surface
    #[arg(long, default_value = DEFAULT_NAME)]
    pub name: String,
}

impl Cli {
    pub fn host_config(&self) -> HostConfig {
        let mut config = HostConfig::new(&self.name);
        config.notify = self.notify;
        config.auto_start = !self.no_auto_start;
        config
    }

    /// Archive mover configuration with platform defaults filled in
    pub fn archive_mover_config(&self) -> Result<ArchiveMoverConfig, ConfigurationError> {
        let source_dir = self
            .src_dir
            .clone()
            .or_else(ArchiveMoverConfig::default_source_dir)
            .ok_or(ConfigurationError::MissingDirectory {
                field: "source_dir",
            })?;
        let destination_dir = self
            .dst_dir
            .clone()
            .or_else(ArchiveMoverConfig::default_destination_dir)
            .ok_or(ConfigurationError::MissingDirectory {
                field: "destination_dir",
            })?;

        let mut config = ArchiveMoverConfig::new(source_dir, destination_dir);
        config.dedup = !self.no_dedup;
        config.image_ratio_threshold = self.threshold;
        config.validated()
    }
}

use std::path::{Path, PathBuf};

/// File names inside the store directory.
pub const BLOCK_METADATA_LOG: &str = "block-metadata-log";
pub const BLOCK_METADATA_CRC: &str = "block-metadata-crc";
pub const LATEST_MESSAGES_LOG: &str = "latest-messages-log";
pub const LATEST_MESSAGES_CRC: &str = "latest-messages-crc";
pub const CHECKPOINTS_DIR: &str = "checkpoints";

/// Configuration of the persistent DAG store.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DagStoreConfig {
    /// Directory holding the logs, sidecars and checkpoints
    pub data_dir: PathBuf,
    /// Growth factor applied to both rollover thresholds
    pub max_size_factor: u64,
    /// Base size of a metadata checkpoint segment, in bytes
    pub checkpoint_size_bytes: u64,
}

impl DagStoreConfig {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            max_size_factor: 10,
            checkpoint_size_bytes: 1024 * 1024,
        }
    }

    pub fn with_max_size_factor(mut self, factor: u64) -> Self {
        self.max_size_factor = factor;
        self
    }

    pub fn with_checkpoint_size_bytes(mut self, bytes: u64) -> Self {
        self.checkpoint_size_bytes = bytes;
        self
    }
}

//! Persistent block metadata log with checkpoint rollover.
//!
//! Records are prost-encoded [`BlockMetadataRecord`]s appended to the
//! framed log. When the active log outgrows
//! `max_size_factor * checkpoint_size_bytes` it is renamed into
//! `checkpoints/<startIdx>-<endIdx>` (record indices, inclusive) and a
//! fresh log is opened. Startup replays checkpoints in index order, then
//! the active log.
//!
//! [`BlockMetadataRecord`]: vertex_types::wire::BlockMetadataRecord

use crate::codec::{read_records_strict, FramedLog};
use crate::config::{DagStoreConfig, BLOCK_METADATA_CRC, BLOCK_METADATA_LOG, CHECKPOINTS_DIR};
use crate::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use vertex_types::BlockMetadata;

pub(crate) struct BlockMetadataStore {
    log: FramedLog,
    checkpoints_dir: PathBuf,
    max_size_factor: u64,
    checkpoint_size_bytes: u64,
    /// Global index of the first record in the active log
    first_record_idx: u64,
    /// Global index the next appended record will get
    next_record_idx: u64,
}

impl BlockMetadataStore {
    /// Open the store, returning the replayed metadata in append order.
    pub fn open(config: &DagStoreConfig) -> Result<(Self, Vec<BlockMetadata>), StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        let checkpoints_dir = config.data_dir.join(CHECKPOINTS_DIR);
        fs::create_dir_all(&checkpoints_dir)?;

        let mut metas = Vec::new();
        for (start, end, path) in sorted_checkpoints(&checkpoints_dir)? {
            let payloads = read_records_strict(&path)?;
            let expected = (end - start + 1) as usize;
            if payloads.len() != expected {
                return Err(StorageError::CorruptCheckpoint(format!(
                    "{}: {} records, name promises {}",
                    path.display(),
                    payloads.len(),
                    expected
                )));
            }
            for payload in &payloads {
                let meta = BlockMetadata::from_record_bytes(payload)
                    .map_err(|e| StorageError::CorruptCheckpoint(e.to_string()))?;
                metas.push(meta);
            }
        }
        let checkpoint_records = metas.len() as u64;

        let (mut log, payloads) = FramedLog::open(
            config.data_dir.join(BLOCK_METADATA_LOG),
            config.data_dir.join(BLOCK_METADATA_CRC),
        )?;
        let mut active = 0u64;
        for (i, payload) in payloads.iter().enumerate() {
            match BlockMetadata::from_record_bytes(payload) {
                Ok(meta) => {
                    metas.push(meta);
                    active += 1;
                }
                Err(e) => {
                    warn!(
                        record = i,
                        error = %e,
                        "undecodable metadata record, truncating log"
                    );
                    log.truncate_tail(&payloads[..i])?;
                    break;
                }
            }
        }

        let store = Self {
            log,
            checkpoints_dir,
            max_size_factor: config.max_size_factor,
            checkpoint_size_bytes: config.checkpoint_size_bytes,
            first_record_idx: checkpoint_records,
            next_record_idx: checkpoint_records + active,
        };
        Ok((store, metas))
    }

    /// Append one metadata record, rolling a checkpoint if the log outgrew
    /// its threshold.
    pub fn append(&mut self, meta: &BlockMetadata) -> Result<(), StorageError> {
        self.log.append(&meta.to_record_bytes())?;
        self.next_record_idx += 1;
        if self.log.len_bytes() > self.max_size_factor * self.checkpoint_size_bytes {
            self.roll()?;
        }
        Ok(())
    }

    /// Roll the active log into a checkpoint regardless of size.
    pub fn force_roll(&mut self) -> Result<(), StorageError> {
        if self.log.record_count() > 0 {
            self.roll()?;
        }
        Ok(())
    }

    fn roll(&mut self) -> Result<(), StorageError> {
        let name = format!("{}-{}", self.first_record_idx, self.next_record_idx - 1);
        self.log.roll_to(&self.checkpoints_dir.join(&name))?;
        info!(checkpoint = %name, "rolled block metadata log into checkpoint");
        self.first_record_idx = self.next_record_idx;
        Ok(())
    }

    /// Remove every record and every checkpoint.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.log.clear()?;
        for entry in fs::read_dir(&self.checkpoints_dir)? {
            fs::remove_file(entry?.path())?;
        }
        self.first_record_idx = 0;
        self.next_record_idx = 0;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<(), StorageError> {
        self.log.sync()?;
        Ok(())
    }
}

/// Checkpoints sorted by start index. Files whose names do not parse as
/// `<start>-<end>` are skipped with a warning (leftover temp files).
fn sorted_checkpoints(dir: &Path) -> Result<Vec<(u64, u64, PathBuf)>, StorageError> {
    let mut checkpoints = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        match parse_checkpoint_name(name) {
            Some((start, end)) => checkpoints.push((start, end, path)),
            None => warn!(file = name, "ignoring unrecognized file in checkpoints dir"),
        }
    }
    checkpoints.sort_by_key(|(start, _, _)| *start);
    Ok(checkpoints)
}

fn parse_checkpoint_name(name: &str) -> Option<(u64, u64)> {
    let (start, end) = name.split_once('-')?;
    let start = start.parse().ok()?;
    let end = end.parse().ok()?;
    (start <= end).then_some((start, end))
}

//! Persistent latest-messages log.
//!
//! Each record is a framed 64-byte payload: `validator ‖ hash`. Updates are
//! append-only; when the log holds many more records than the map has
//! validators it is squashed down to one record per validator.

use crate::codec::FramedLog;
use crate::config::{DagStoreConfig, LATEST_MESSAGES_CRC, LATEST_MESSAGES_LOG};
use crate::error::StorageError;
use tracing::{info, warn};
use vertex_types::{BlockHash, ValidatorId};

const RECORD_LEN: usize = ValidatorId::LEN + BlockHash::LEN;

pub(crate) struct LatestMessagesStore {
    log: FramedLog,
    max_size_factor: u64,
    records_since_squash: u64,
}

impl LatestMessagesStore {
    /// Open the store, returning the replayed updates in append order.
    pub fn open(
        config: &DagStoreConfig,
    ) -> Result<(Self, Vec<(ValidatorId, BlockHash)>), StorageError> {
        let (mut log, payloads) = FramedLog::open(
            config.data_dir.join(LATEST_MESSAGES_LOG),
            config.data_dir.join(LATEST_MESSAGES_CRC),
        )?;

        let mut entries = Vec::new();
        for (i, payload) in payloads.iter().enumerate() {
            if payload.len() != RECORD_LEN {
                warn!(
                    record = i,
                    len = payload.len(),
                    "undecodable latest-message record, truncating log"
                );
                log.truncate_tail(&payloads[..i])?;
                break;
            }
            let validator = ValidatorId::from_slice(&payload[..ValidatorId::LEN])
                .map_err(|e| StorageError::Codec(e.to_string()))?;
            let hash = BlockHash::from_slice(&payload[ValidatorId::LEN..])
                .map_err(|e| StorageError::Codec(e.to_string()))?;
            entries.push((validator, hash));
        }

        let store = Self {
            log,
            max_size_factor: config.max_size_factor,
            records_since_squash: entries.len() as u64,
        };
        Ok((store, entries))
    }

    pub fn append(&mut self, validator: &ValidatorId, hash: &BlockHash) -> Result<(), StorageError> {
        let mut payload = Vec::with_capacity(RECORD_LEN);
        payload.extend_from_slice(validator.as_bytes());
        payload.extend_from_slice(hash.as_bytes());
        self.log.append(&payload)?;
        self.records_since_squash += 1;
        Ok(())
    }

    /// Squash if the log has outgrown the map.
    pub fn maybe_squash(
        &mut self,
        map: &im::HashMap<ValidatorId, BlockHash>,
    ) -> Result<(), StorageError> {
        if map.is_empty() || self.records_since_squash <= self.max_size_factor * map.len() as u64 {
            return Ok(());
        }
        let payloads: Vec<Vec<u8>> = map
            .iter()
            .map(|(validator, hash)| {
                let mut payload = Vec::with_capacity(RECORD_LEN);
                payload.extend_from_slice(validator.as_bytes());
                payload.extend_from_slice(hash.as_bytes());
                payload
            })
            .collect();
        self.log.replace_with(&payloads)?;
        self.records_since_squash = payloads.len() as u64;
        info!(entries = payloads.len(), "squashed latest-messages log");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.log.clear()?;
        self.records_since_squash = 0;
        Ok(())
    }

    pub fn sync(&mut self) -> Result<(), StorageError> {
        self.log.sync()?;
        Ok(())
    }
}

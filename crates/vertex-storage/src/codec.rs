//! Append-only framed log with a CRC-32 sidecar.
//!
//! Record layout: `u32 LE payload length ‖ payload bytes`. The sidecar file
//! holds a single little-endian u32: the CRC-32/IEEE of every payload in
//! order, updated incrementally on append and rewritten atomically
//! (write temp + rename).
//!
//! Recovery on open stops at the first frame that cannot be fully read and
//! truncates the file there, so a node that crashed mid-append always boots.

use crate::error::StorageError;
use crc32fast::Hasher;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub(crate) struct FramedLog {
    path: PathBuf,
    crc_path: PathBuf,
    writer: File,
    crc: Hasher,
    len_bytes: u64,
    record_count: u64,
}

impl FramedLog {
    /// Open (or create) the log, recovering surviving records.
    ///
    /// A short length prefix, a declared length that overruns the file, or
    /// any trailing garbage truncates the file to the last good offset. The
    /// sidecar is rewritten whenever it disagrees with the surviving
    /// payloads; the records win.
    pub fn open(path: PathBuf, crc_path: PathBuf) -> io::Result<(Self, Vec<Vec<u8>>)> {
        let buf = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };

        let (payloads, good) = parse_frames(&buf);

        let mut writer = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;

        if (buf.len() as u64) > good {
            warn!(
                path = %path.display(),
                dropped = buf.len() as u64 - good,
                "truncating corrupt log tail"
            );
            writer.set_len(good)?;
            writer.sync_data()?;
        }
        writer.seek(SeekFrom::End(0))?;

        let mut crc = Hasher::new();
        for payload in &payloads {
            crc.update(payload);
        }
        let computed = crc.clone().finalize();

        let stored = fs::read(&crc_path)
            .ok()
            .and_then(|bytes| <[u8; 4]>::try_from(bytes.as_slice()).ok())
            .map(u32::from_le_bytes);
        if stored != Some(computed) {
            if stored.is_some() {
                warn!(path = %crc_path.display(), "checksum sidecar mismatch, rewriting");
            }
            write_sidecar(&crc_path, computed)?;
        }

        let log = Self {
            path,
            crc_path,
            writer,
            crc,
            len_bytes: good,
            record_count: payloads.len() as u64,
        };
        Ok((log, payloads))
    }

    /// Append one framed record and commit it (data sync + sidecar rewrite).
    pub fn append(&mut self, payload: &[u8]) -> io::Result<()> {
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(payload);

        self.writer.write_all(&frame)?;
        self.writer.sync_data()?;

        self.crc.update(payload);
        write_sidecar(&self.crc_path, self.crc.clone().finalize())?;

        self.len_bytes += frame.len() as u64;
        self.record_count += 1;
        Ok(())
    }

    /// Drop every record after the first `kept.len()` and recompute the
    /// sidecar. Used when a record survives framing but fails to decode.
    pub fn truncate_tail(&mut self, kept: &[Vec<u8>]) -> io::Result<()> {
        let offset: u64 = kept.iter().map(|p| 4 + p.len() as u64).sum();
        self.writer.set_len(offset)?;
        self.writer.sync_data()?;
        self.writer.seek(SeekFrom::End(0))?;

        self.crc = Hasher::new();
        for payload in kept {
            self.crc.update(payload);
        }
        write_sidecar(&self.crc_path, self.crc.clone().finalize())?;

        self.len_bytes = offset;
        self.record_count = kept.len() as u64;
        Ok(())
    }

    /// Atomically replace the log contents with the given payloads.
    pub fn replace_with(&mut self, payloads: &[Vec<u8>]) -> io::Result<()> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            for payload in payloads {
                file.write_all(&(payload.len() as u32).to_le_bytes())?;
                file.write_all(payload)?;
            }
            file.sync_data()?;
        }
        fs::rename(&tmp, &self.path)?;

        self.writer = OpenOptions::new().read(true).write(true).open(&self.path)?;
        self.writer.seek(SeekFrom::End(0))?;

        self.crc = Hasher::new();
        for payload in payloads {
            self.crc.update(payload);
        }
        write_sidecar(&self.crc_path, self.crc.clone().finalize())?;

        self.len_bytes = payloads.iter().map(|p| 4 + p.len() as u64).sum();
        self.record_count = payloads.len() as u64;
        Ok(())
    }

    /// Move the current log file to `dest` and start a fresh, empty log.
    pub fn roll_to(&mut self, dest: &Path) -> io::Result<()> {
        self.writer.sync_data()?;
        fs::rename(&self.path, dest)?;

        self.writer = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;

        self.crc = Hasher::new();
        write_sidecar(&self.crc_path, self.crc.clone().finalize())?;

        self.len_bytes = 0;
        self.record_count = 0;
        Ok(())
    }

    /// Truncate the log to zero length and reset the sidecar.
    pub fn clear(&mut self) -> io::Result<()> {
        self.writer.set_len(0)?;
        self.writer.sync_data()?;
        self.writer.seek(SeekFrom::Start(0))?;

        self.crc = Hasher::new();
        write_sidecar(&self.crc_path, self.crc.clone().finalize())?;

        self.len_bytes = 0;
        self.record_count = 0;
        Ok(())
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.writer.sync_data()
    }

    pub fn len_bytes(&self) -> u64 {
        self.len_bytes
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }
}

/// Read a rolled (checkpoint) log. Unlike the active log, any framing
/// damage here is an error: checkpoints were valid when rolled.
pub(crate) fn read_records_strict(path: &Path) -> Result<Vec<Vec<u8>>, StorageError> {
    let buf = fs::read(path)?;
    let (payloads, good) = parse_frames(&buf);
    if good != buf.len() as u64 {
        return Err(StorageError::CorruptCheckpoint(format!(
            "{}: trailing garbage at offset {}",
            path.display(),
            good
        )));
    }
    Ok(payloads)
}

fn parse_frames(buf: &[u8]) -> (Vec<Vec<u8>>, u64) {
    let mut payloads = Vec::new();
    let mut off = 0usize;
    loop {
        let Some(prefix) = buf.get(off..off + 4) else {
            break;
        };
        let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        let Some(payload) = buf.get(off + 4..off + 4 + len) else {
            break;
        };
        payloads.push(payload.to_vec());
        off += 4 + len;
    }
    (payloads, off as u64)
}

fn write_sidecar(crc_path: &Path, crc: u32) -> io::Result<()> {
    let tmp = crc_path.with_extension("tmp");
    fs::write(&tmp, crc.to_le_bytes())?;
    fs::rename(&tmp, crc_path)?;
    Ok(())
}

// WAL writer module - handles appending entries to the log
//
// Segments rotate after a fixed number of entries rather than a byte
// threshold: the replay contract is defined in operations, and the default
// of 100 entries per segment keeps each file small enough to rewrite-scan
// on open.

use crate::record::{LogEntry, LogPayload};
use crate::segment::SegmentManager;
use crate::SyncMode;
use censusdb_core::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

pub struct WalWriter {
    file: BufWriter<File>,
    current_segment: PathBuf,
    entries_in_segment: u64,
    max_segment_entries: u64,
    sync_mode: SyncMode,
    sequence: u64,
    wal_dir: PathBuf,
}

impl WalWriter {
    pub fn new(wal_dir: &Path, max_segment_entries: u64, sync_mode: SyncMode) -> Result<Self> {
        std::fs::create_dir_all(wal_dir)
            .map_err(|e| Error::Storage(format!("Failed to create WAL directory: {}", e)))?;

        // Resume from the latest segment if one exists, otherwise start a
        // fresh log at sequence 0.
        let latest = SegmentManager::new(wal_dir.to_path_buf()).latest_segment()?;

        let (segment_path, sequence, entries_in_segment) = match latest {
            Some(info) => {
                let (count, last_sequence, valid_len) = Self::scan_segment(&info.path)?;
                if valid_len < info.size {
                    // A torn frame from a crashed append; drop it so new
                    // entries start on a clean boundary.
                    warn!(
                        segment = %info.path.display(),
                        torn_bytes = info.size - valid_len,
                        "truncating torn tail before appending"
                    );
                    let file = OpenOptions::new().write(true).open(&info.path)?;
                    file.set_len(valid_len)?;
                    file.sync_all()?;
                }
                (
                    info.path,
                    last_sequence.unwrap_or(info.sequence.saturating_sub(1)),
                    count,
                )
            }
            None => {
                let name = format!("wal-{:016x}.log", 1u64);
                (wal_dir.join(name), 0, 0)
            }
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&segment_path)
            .map_err(|e| Error::Storage(format!("Failed to open WAL segment: {}", e)))?;

        Ok(Self {
            file: BufWriter::new(file),
            current_segment: segment_path,
            entries_in_segment,
            max_segment_entries,
            sync_mode,
            sequence,
            wal_dir: wal_dir.to_path_buf(),
        })
    }

    /// Count the valid entries in a segment and find where they end.
    ///
    /// Returns (entry count, last sequence seen, byte length of the valid
    /// prefix).
    fn scan_segment(path: &Path) -> Result<(u64, Option<u64>, u64)> {
        let mut bytes = Vec::new();
        File::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open segment {:?}: {}", path, e)))?
            .read_to_end(&mut bytes)?;

        let mut offset = 0usize;
        let mut count = 0u64;
        let mut last_sequence = None;

        while offset < bytes.len() {
            match LogEntry::decode(&bytes[offset..]) {
                Ok((entry, consumed)) => {
                    last_sequence = Some(entry.sequence);
                    count += 1;
                    offset += consumed;
                }
                Err(Error::Serialization(_)) => break, // torn tail
                Err(e) => return Err(e),
            }
        }

        Ok((count, last_sequence, offset as u64))
    }

    /// Append a payload as the next entry in the log.
    ///
    /// Returns the sequence number assigned to the entry.
    pub fn append(&mut self, payload: LogPayload) -> Result<u64> {
        if self.entries_in_segment >= self.max_segment_entries {
            self.rotate_segment()?;
        }

        self.sequence += 1;
        let entry = LogEntry::new(self.sequence, unix_millis(), payload);
        let encoded = entry.encode()?;

        self.file
            .write_all(&encoded)
            .map_err(|e| Error::Storage(format!("Failed to write WAL entry: {}", e)))?;

        self.entries_in_segment += 1;

        if matches!(self.sync_mode, SyncMode::Sync) {
            self.sync()?;
        }

        Ok(self.sequence)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| Error::Storage(format!("Failed to flush WAL: {}", e)))?;

        self.file
            .get_ref()
            .sync_all()
            .map_err(|e| Error::Storage(format!("Failed to sync WAL: {}", e)))?;

        Ok(())
    }

    fn rotate_segment(&mut self) -> Result<()> {
        // The old segment must be durable before entries land in a new one.
        self.sync()?;

        let segment_name = format!("wal-{:016x}.log", self.sequence + 1);
        let new_segment = self.wal_dir.join(&segment_name);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&new_segment)
            .map_err(|e| Error::Storage(format!("Failed to create new segment: {}", e)))?;

        self.file = BufWriter::new(file);
        self.current_segment = new_segment;
        self.entries_in_segment = 0;

        Ok(())
    }

    /// Get the current segment path
    pub fn current_segment_path(&self) -> &PathBuf {
        &self.current_segment
    }

    /// Get the last assigned sequence number
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Get the number of entries in the current segment
    pub fn entries_in_segment(&self) -> u64 {
        self.entries_in_segment
    }
}

impl Drop for WalWriter {
    fn drop(&mut self) {
        // Best effort sync on drop
        let _ = self.sync();
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

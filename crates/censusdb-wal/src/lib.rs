//! # CensusDB WAL (Write-Ahead Log)
//!
//! Segment-rotated write-ahead log for CensusDB. Every mutation is logged
//! before it touches a bucket or index file, and marked with a Commit
//! entry once fully applied; at startup the log identifies operations the
//! previous process never finished so the store can undo them.
//!
//! This crate is an internal implementation detail of CensusDB. Depend on
//! the main `censusdb` crate instead, which provides the stable public
//! API.

use censusdb_core::Result;
use serde::{Deserialize, Serialize};

pub mod reader;
pub mod record;
pub mod recovery;
pub mod segment;
pub mod writer;

pub use reader::WalReader;
pub use record::{LogEntry, LogKind, LogPayload};
pub use recovery::{ReplayPlan, ReplayPlanner};
pub use segment::{SegmentInfo, SegmentManager};
pub use writer::WalWriter;

/// Default number of entries per segment before rotation
pub const DEFAULT_SEGMENT_ENTRIES: u64 = 100;

/// WAL configuration options
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Sync mode: sync, async, or none
    pub sync_mode: SyncMode,
    /// Number of entries per segment before rotation
    pub max_segment_entries: u64,
    /// Directory path for WAL segments
    pub wal_dir: std::path::PathBuf,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Sync,
            max_segment_entries: DEFAULT_SEGMENT_ENTRIES,
            wal_dir: std::path::PathBuf::from("wal"),
        }
    }
}

/// Sync mode for WAL writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Call fsync after every append (strongest durability)
    Sync,
    /// Buffer writes, fsync on segment boundaries (balanced)
    Async,
    /// No fsync (fastest, unsafe for power loss)
    None,
}

/// WAL handle coordinating log writing and replay planning
pub struct Wal {
    config: WalConfig,
    writer: Option<WalWriter>,
}

impl Wal {
    /// Create a WAL handle; the log is not opened for writing yet.
    pub fn new(config: WalConfig) -> Self {
        Self {
            config,
            writer: None,
        }
    }

    /// Open the active segment for appending.
    pub fn open(&mut self) -> Result<()> {
        let writer = WalWriter::new(
            &self.config.wal_dir,
            self.config.max_segment_entries,
            self.config.sync_mode,
        )?;
        self.writer = Some(writer);

        Ok(())
    }

    /// Append an operation payload; returns the assigned sequence.
    pub fn append(&mut self, payload: LogPayload) -> Result<u64> {
        self.open_writer()?.append(payload)
    }

    /// Append a Commit marker for the operation logged at `sequence`.
    pub fn commit(&mut self, sequence: u64) -> Result<u64> {
        self.open_writer()?.append(LogPayload::Commit { sequence })
    }

    /// Sync the active segment to disk.
    pub fn sync(&mut self) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            writer.sync()
        } else {
            Ok(())
        }
    }

    /// Close the WAL, syncing any buffered entries.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.sync()?;
        }
        Ok(())
    }

    /// Plan replay of the log left by the previous process.
    ///
    /// Must run before `open`: replay reads segments that opening would
    /// start appending to.
    pub fn plan_replay(&self) -> Result<ReplayPlan> {
        ReplayPlanner::new(self.config.clone()).plan()
    }

    /// Delete all segments once a replay plan is fully applied.
    pub fn discard_segments(&self) -> Result<usize> {
        ReplayPlanner::new(self.config.clone()).discard_segments()
    }

    /// Get a segment manager for the WAL directory
    pub fn segment_manager(&self) -> SegmentManager {
        SegmentManager::new(self.config.wal_dir.clone())
    }

    /// Get the current configuration
    pub fn config(&self) -> &WalConfig {
        &self.config
    }

    /// Check if the WAL is open for writing
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn open_writer(&mut self) -> Result<&mut WalWriter> {
        self.writer
            .as_mut()
            .ok_or_else(|| censusdb_core::Error::Storage("WAL not opened".to_string()))
    }
}

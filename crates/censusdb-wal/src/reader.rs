// WAL reader module - iterates entries across all segments in log order
//
// The reader handles:
// 1. Segment discovery - finding all WAL segment files in order
// 2. Entry reading - iterating through entries in each segment
// 3. CRC validation - verifying data integrity of each entry
//
// A torn frame at the tail of the final segment is tolerated (the append
// that produced it never finished, so no mutation depends on it). A torn
// frame anywhere else, or a CRC failure, is real corruption and surfaces
// as an error.

use crate::record::LogEntry;
use crate::segment::SegmentManager;
use censusdb_core::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::warn;

/// WAL reader for reading entries from log segments
pub struct WalReader {
    /// Segment file paths in creation order
    segments: Vec<PathBuf>,
    /// Index of current segment being read
    current_segment_index: usize,
    /// Buffered reader for current segment
    reader: Option<BufReader<File>>,
}

impl WalReader {
    /// Create a new WAL reader for the given WAL directory
    pub fn new(wal_dir: &Path) -> Result<Self> {
        let segments = SegmentManager::new(wal_dir.to_path_buf())
            .list_segments()?
            .into_iter()
            .map(|info| info.path)
            .collect::<Vec<_>>();

        let mut reader = Self {
            segments,
            current_segment_index: 0,
            reader: None,
        };

        if !reader.segments.is_empty() {
            reader.open_segment(0)?;
        }

        Ok(reader)
    }

    /// Open a segment file by index
    fn open_segment(&mut self, index: usize) -> Result<()> {
        let path = &self.segments[index];
        let file = File::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open segment {:?}: {}", path, e)))?;

        self.reader = Some(BufReader::new(file));
        self.current_segment_index = index;

        Ok(())
    }

    /// Move to the next segment; returns false when there is none.
    fn advance_segment(&mut self) -> Result<bool> {
        let next_index = self.current_segment_index + 1;
        if next_index >= self.segments.len() {
            self.reader = None;
            return Ok(false);
        }

        self.open_segment(next_index)?;
        Ok(true)
    }

    fn on_last_segment(&self) -> bool {
        self.current_segment_index + 1 >= self.segments.len()
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(Some(entry))` if an entry was read,
    /// `Ok(None)` once all segments are exhausted,
    /// or an error on corruption.
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        loop {
            let reader = match &mut self.reader {
                Some(r) => r,
                None => return Ok(None), // No more segments
            };

            match Self::read_entry(reader) {
                Ok(Some(entry)) => return Ok(Some(entry)),
                Ok(None) => {
                    // End of current segment, try next
                    if !self.advance_segment()? {
                        return Ok(None);
                    }
                }
                Err(Error::Serialization(msg)) => {
                    if self.on_last_segment() {
                        warn!(
                            segment = self.current_segment_index,
                            detail = %msg,
                            "discarding torn entry at log tail"
                        );
                        self.reader = None;
                        return Ok(None);
                    }
                    return Err(Error::WalReplay(format!(
                        "truncated entry inside segment {}: {}",
                        self.current_segment_index, msg
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read a single entry from a reader.
    fn read_entry(reader: &mut BufReader<File>) -> Result<Option<LogEntry>> {
        // Read length field (4 bytes)
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None); // End of segment
            }
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read entry length: {}",
                    e
                )));
            }
        }

        let content_len = u32::from_le_bytes(len_buf) as usize;
        if content_len == 0 || content_len > crate::record::MAX_CONTENT_LEN {
            // A length field is written atomically with its frame prefix,
            // so a nonsense value is corruption rather than a torn tail.
            return Err(Error::Storage(format!(
                "Entry length out of bounds: {} bytes",
                content_len
            )));
        }

        // Read content (kind + entry) and CRC
        let total_data_len = content_len + 4;
        let mut data = vec![0u8; total_data_len];

        reader.read_exact(&mut data).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Serialization("Incomplete entry: truncated".to_string())
            } else {
                Error::Storage(format!("Failed to read entry data: {}", e))
            }
        })?;

        // Build full frame for decoding
        let mut frame = Vec::with_capacity(4 + total_data_len);
        frame.extend_from_slice(&len_buf);
        frame.extend_from_slice(&data);

        // Decode entry (includes CRC validation)
        let (entry, _) = LogEntry::decode(&frame)?;

        Ok(Some(entry))
    }

    /// Get the number of segments discovered
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Read all remaining entries into a vector
    pub fn read_all(&mut self) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl Iterator for WalReader {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

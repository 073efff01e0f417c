// WAL entry format and encoding/decoding
//
// Frame format (binary):
// [length: u32 LE] [kind: u8] [bincode entry bytes] [crc32: u32 LE]
//
// Kinds:
// - CREATE (1): a record was about to be inserted
// - UPDATE (2): a record's attributes were about to change
// - DELETE (3): a record was about to be removed
// - COMMIT (4): the operation with the referenced sequence fully applied
//
// Create/Update/Delete payloads carry the full pre-operation record so an
// incomplete operation can be undone from the log alone.

use censusdb_core::{Error, Record, RecordKey, RecordPatch, Result};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Upper bound on a single frame's content, as a corruption guard.
pub(crate) const MAX_CONTENT_LEN: usize = 1024 * 1024;

/// WAL entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogKind {
    Create = 1,
    Update = 2,
    Delete = 3,
    Commit = 4,
}

impl TryFrom<u8> for LogKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(LogKind::Create),
            2 => Ok(LogKind::Update),
            3 => Ok(LogKind::Delete),
            4 => Ok(LogKind::Commit),
            _ => Err(Error::Storage(format!(
                "Unknown WAL entry kind: {}",
                value
            ))),
        }
    }
}

/// WAL entry payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogPayload {
    /// The record a create was about to insert
    Create { record: Record },
    /// The pre-operation record and the patch an update was about to apply
    Update {
        key: RecordKey,
        old: Record,
        patch: RecordPatch,
    },
    /// The record a delete was about to remove
    Delete { record: Record },
    /// Marks the operation logged at `sequence` as fully applied
    Commit { sequence: u64 },
}

/// A single WAL entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Monotonically increasing position in the log
    pub sequence: u64,
    /// Wall-clock time the entry was appended (unix millis)
    pub timestamp_ms: u64,
    /// What was about to happen, with enough data to undo it
    pub payload: LogPayload,
}

impl LogEntry {
    /// Create an entry from its parts.
    pub fn new(sequence: u64, timestamp_ms: u64, payload: LogPayload) -> Self {
        Self {
            sequence,
            timestamp_ms,
            payload,
        }
    }

    /// The kind implied by this entry's payload.
    pub fn kind(&self) -> LogKind {
        match self.payload {
            LogPayload::Create { .. } => LogKind::Create,
            LogPayload::Update { .. } => LogKind::Update,
            LogPayload::Delete { .. } => LogKind::Delete,
            LogPayload::Commit { .. } => LogKind::Commit,
        }
    }

    /// Encode the entry with framing and CRC.
    /// Format: [length: u32 LE] [kind: u8] [entry bytes] [crc32: u32 LE]
    pub fn encode(&self) -> Result<Vec<u8>> {
        let entry_bytes = bincode::serialize(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize entry: {}", e)))?;

        let kind_byte = self.kind() as u8;
        let content_len = 1 + entry_bytes.len();

        let mut hasher = Hasher::new();
        hasher.update(&[kind_byte]);
        hasher.update(&entry_bytes);
        let crc = hasher.finalize();

        let mut frame = Vec::with_capacity(4 + content_len + 4);
        frame.extend_from_slice(&(content_len as u32).to_le_bytes());
        frame.push(kind_byte);
        frame.extend_from_slice(&entry_bytes);
        frame.extend_from_slice(&crc.to_le_bytes());

        Ok(frame)
    }

    /// Decode an entry from bytes, validating the CRC and the kind byte.
    ///
    /// Returns the entry and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 9 {
            // Minimum: 4 (length) + 1 (kind) + 0 (entry) + 4 (crc)
            return Err(Error::Serialization("Incomplete entry frame".to_string()));
        }

        let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if length == 0 || length > MAX_CONTENT_LEN {
            return Err(Error::Storage(format!(
                "Entry length out of bounds: {} bytes",
                length
            )));
        }

        let total_size = 4 + length + 4;
        if data.len() < total_size {
            return Err(Error::Serialization(format!(
                "Incomplete entry: expected {} bytes, got {}",
                total_size,
                data.len()
            )));
        }

        let kind_byte = data[4];
        let kind = LogKind::try_from(kind_byte)?;

        let entry_bytes = &data[5..4 + length];

        let crc_offset = 4 + length;
        let expected_crc = u32::from_le_bytes([
            data[crc_offset],
            data[crc_offset + 1],
            data[crc_offset + 2],
            data[crc_offset + 3],
        ]);

        let mut hasher = Hasher::new();
        hasher.update(&[kind_byte]);
        hasher.update(entry_bytes);
        let actual_crc = hasher.finalize();

        if actual_crc != expected_crc {
            return Err(Error::Storage(format!(
                "CRC mismatch: expected {}, got {}",
                expected_crc, actual_crc
            )));
        }

        // The CRC already passed, so a decode failure here is corruption
        // of meaning rather than of bytes - never a torn tail.
        let entry: LogEntry = bincode::deserialize(entry_bytes)
            .map_err(|e| Error::Storage(format!("Failed to deserialize entry: {}", e)))?;

        if entry.kind() != kind {
            return Err(Error::Storage(format!(
                "Entry kind byte {:?} does not match payload {:?}",
                kind,
                entry.kind()
            )));
        }

        Ok((entry, total_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use censusdb_core::{Occupation, State};

    fn sample_record() -> Record {
        Record::new(
            RecordKey::new("123456789").unwrap(),
            State::California,
            Occupation::Engineer,
        )
    }

    #[test]
    fn test_kind_conversion() {
        assert_eq!(LogKind::try_from(1).unwrap(), LogKind::Create);
        assert_eq!(LogKind::try_from(4).unwrap(), LogKind::Commit);
        assert!(LogKind::try_from(99).is_err());
    }

    #[test]
    fn test_create_entry_encode_decode() {
        let entry = LogEntry::new(
            7,
            1_700_000_000_000,
            LogPayload::Create {
                record: sample_record(),
            },
        );

        let encoded = entry.encode().unwrap();
        assert!(encoded.len() > 9);

        let (decoded, size) = LogEntry::decode(&encoded).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(size, encoded.len());
        assert_eq!(decoded.kind(), LogKind::Create);
    }

    #[test]
    fn test_update_entry_carries_old_record() {
        let old = sample_record();
        let entry = LogEntry::new(
            3,
            0,
            LogPayload::Update {
                key: old.key.clone(),
                old: old.clone(),
                patch: RecordPatch::new().state(State::NewYork),
            },
        );

        let encoded = entry.encode().unwrap();
        let (decoded, _) = LogEntry::decode(&encoded).unwrap();

        match decoded.payload {
            LogPayload::Update {
                old: decoded_old, ..
            } => assert_eq!(decoded_old, old),
            other => panic!("expected Update payload, got {:?}", other),
        }
    }

    #[test]
    fn test_commit_entry_encode_decode() {
        let entry = LogEntry::new(8, 0, LogPayload::Commit { sequence: 7 });

        let encoded = entry.encode().unwrap();
        let (decoded, _) = LogEntry::decode(&encoded).unwrap();

        assert_eq!(decoded, entry);
        assert_eq!(decoded.kind(), LogKind::Commit);
    }

    #[test]
    fn test_crc_validation() {
        let entry = LogEntry::new(
            1,
            0,
            LogPayload::Delete {
                record: sample_record(),
            },
        );
        let mut encoded = entry.encode().unwrap();

        // Corrupt a payload byte
        let mid = encoded.len() / 2;
        encoded[mid] ^= 0xFF;

        assert!(LogEntry::decode(&encoded).is_err());
    }

    #[test]
    fn test_incomplete_frame() {
        let entry = LogEntry::new(1, 0, LogPayload::Commit { sequence: 1 });
        let encoded = entry.encode().unwrap();

        let result = LogEntry::decode(&encoded[..5]);
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&(u32::MAX).to_le_bytes());
        frame.extend_from_slice(&[0u8; 16]);

        assert!(matches!(LogEntry::decode(&frame), Err(Error::Storage(_))));
    }
}

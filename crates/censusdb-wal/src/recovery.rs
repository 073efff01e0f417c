// WAL replay planning - determines which logged operations never committed
//
// The log is written before each mutation and a Commit entry is appended
// after the mutation is fully applied. At startup, every Create/Update/
// Delete entry whose sequence has no matching Commit describes an
// operation the process died in the middle of; the store must undo it.
//
// This module only plans: it reads the log and reports the incomplete
// operations. Applying the inverse actions is the orchestrator's job,
// which keeps this crate independent of the storage layer.

use crate::record::{LogEntry, LogPayload};
use crate::reader::WalReader;
use crate::segment::SegmentManager;
use crate::WalConfig;
use censusdb_core::{Error, Result};
use std::collections::HashSet;
use tracing::info;

/// Plans recovery from the log left behind by the previous process.
pub struct ReplayPlanner {
    config: WalConfig,
}

/// The outcome of scanning the log at startup.
#[derive(Debug, Clone, Default)]
pub struct ReplayPlan {
    /// Operations with no Commit marker, in log order. Undo them in
    /// reverse to restore the pre-crash state.
    pub incomplete: Vec<LogEntry>,
    /// Total entries scanned, Commit markers included
    pub total_entries: usize,
    /// Number of operations that did commit
    pub committed: usize,
    /// Number of segment files scanned
    pub segment_count: usize,
}

impl ReplayPlanner {
    /// Create a planner for the given WAL configuration
    pub fn new(config: WalConfig) -> Self {
        Self { config }
    }

    /// Scan all segments and report the incomplete operations.
    ///
    /// Any malformed entry other than a torn tail aborts with
    /// `Error::WalReplay`: a log that cannot be fully resolved must not be
    /// partially acted on.
    pub fn plan(&self) -> Result<ReplayPlan> {
        let mut reader = WalReader::new(&self.config.wal_dir)?;
        let segment_count = reader.segment_count();

        if segment_count == 0 {
            return Ok(ReplayPlan::default());
        }

        let mut operations: Vec<LogEntry> = Vec::new();
        let mut committed_sequences: HashSet<u64> = HashSet::new();
        let mut total_entries = 0usize;

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    total_entries += 1;
                    match &entry.payload {
                        LogPayload::Commit { sequence } => {
                            committed_sequences.insert(*sequence);
                        }
                        _ => operations.push(entry),
                    }
                }
                Ok(None) => break,
                Err(Error::WalReplay(msg)) => return Err(Error::WalReplay(msg)),
                Err(e) => {
                    return Err(Error::WalReplay(format!(
                        "unresolvable log entry: {}",
                        e
                    )));
                }
            }
        }

        let committed = operations
            .iter()
            .filter(|op| committed_sequences.contains(&op.sequence))
            .count();

        let incomplete: Vec<LogEntry> = operations
            .into_iter()
            .filter(|op| !committed_sequences.contains(&op.sequence))
            .collect();

        info!(
            segments = segment_count,
            total = total_entries,
            committed,
            incomplete = incomplete.len(),
            "replay plan ready"
        );

        Ok(ReplayPlan {
            incomplete,
            total_entries,
            committed,
            segment_count,
        })
    }

    /// Delete every segment once the plan has been fully applied.
    pub fn discard_segments(&self) -> Result<usize> {
        SegmentManager::new(self.config.wal_dir.clone()).cleanup_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WalWriter;
    use crate::SyncMode;
    use censusdb_core::{Occupation, Record, RecordKey, State};
    use tempfile::TempDir;

    fn setup_test_wal() -> (TempDir, WalConfig) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let wal_path = temp_dir.path().join("wal");
        std::fs::create_dir_all(&wal_path).expect("Failed to create WAL dir");

        let config = WalConfig {
            wal_dir: wal_path,
            sync_mode: SyncMode::Sync,
            max_segment_entries: 100,
        };

        (temp_dir, config)
    }

    fn record(key: &str) -> Record {
        Record::new(
            RecordKey::new(key).unwrap(),
            State::Vermont,
            Occupation::Doctor,
        )
    }

    #[test]
    fn test_plan_empty_wal() {
        let (_temp_dir, config) = setup_test_wal();

        let plan = ReplayPlanner::new(config).plan().expect("Failed to plan");
        assert!(plan.incomplete.is_empty());
        assert_eq!(plan.total_entries, 0);
    }

    #[test]
    fn test_committed_operations_excluded() {
        let (_temp_dir, config) = setup_test_wal();

        {
            let mut writer = WalWriter::new(
                &config.wal_dir,
                config.max_segment_entries,
                config.sync_mode,
            )
            .expect("Failed to create writer");

            let seq = writer
                .append(LogPayload::Create {
                    record: record("000000001"),
                })
                .expect("Failed to append");
            writer
                .append(LogPayload::Commit { sequence: seq })
                .expect("Failed to append");
        }

        let plan = ReplayPlanner::new(config).plan().expect("Failed to plan");
        assert!(plan.incomplete.is_empty());
        assert_eq!(plan.committed, 1);
        assert_eq!(plan.total_entries, 2);
    }

    #[test]
    fn test_uncommitted_operation_reported() {
        let (_temp_dir, config) = setup_test_wal();

        {
            let mut writer = WalWriter::new(
                &config.wal_dir,
                config.max_segment_entries,
                config.sync_mode,
            )
            .expect("Failed to create writer");

            let seq = writer
                .append(LogPayload::Create {
                    record: record("000000001"),
                })
                .expect("Failed to append");
            writer
                .append(LogPayload::Commit { sequence: seq })
                .expect("Failed to append");

            // Crash before this one's commit
            writer
                .append(LogPayload::Delete {
                    record: record("000000002"),
                })
                .expect("Failed to append");
        }

        let plan = ReplayPlanner::new(config).plan().expect("Failed to plan");
        assert_eq!(plan.incomplete.len(), 1);
        assert_eq!(plan.committed, 1);
        match &plan.incomplete[0].payload {
            LogPayload::Delete { record: r } => assert_eq!(r.key.as_str(), "000000002"),
            other => panic!("expected Delete, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_spans_rotated_segments() {
        let (_temp_dir, mut config) = setup_test_wal();
        config.max_segment_entries = 3;

        {
            let mut writer = WalWriter::new(
                &config.wal_dir,
                config.max_segment_entries,
                config.sync_mode,
            )
            .expect("Failed to create writer");

            // Commits land in later segments than the operations they close.
            let mut pending = Vec::new();
            for i in 0..5u64 {
                let seq = writer
                    .append(LogPayload::Create {
                        record: record(&format!("{:09}", i)),
                    })
                    .expect("Failed to append");
                pending.push(seq);
            }
            for seq in pending {
                writer
                    .append(LogPayload::Commit { sequence: seq })
                    .expect("Failed to append");
            }
        }

        let plan = ReplayPlanner::new(config).plan().expect("Failed to plan");
        assert!(plan.segment_count > 1);
        assert!(plan.incomplete.is_empty());
        assert_eq!(plan.committed, 5);
    }

    #[test]
    fn test_torn_tail_does_not_fail_plan() {
        let (_temp_dir, config) = setup_test_wal();

        let segment_path = {
            let mut writer = WalWriter::new(
                &config.wal_dir,
                config.max_segment_entries,
                config.sync_mode,
            )
            .expect("Failed to create writer");
            writer
                .append(LogPayload::Create {
                    record: record("000000001"),
                })
                .expect("Failed to append");
            writer.current_segment_path().clone()
        };

        {
            use std::io::Write as _;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&segment_path)
                .unwrap();
            file.write_all(&[7u8, 1]).unwrap();
        }

        let plan = ReplayPlanner::new(config).plan().expect("Failed to plan");
        assert_eq!(plan.incomplete.len(), 1);
    }

    #[test]
    fn test_corruption_aborts_plan() {
        let (_temp_dir, config) = setup_test_wal();

        let segment_path = {
            let mut writer = WalWriter::new(
                &config.wal_dir,
                config.max_segment_entries,
                config.sync_mode,
            )
            .expect("Failed to create writer");
            for i in 0..3u64 {
                writer
                    .append(LogPayload::Create {
                        record: record(&format!("{:09}", i)),
                    })
                    .expect("Failed to append");
            }
            writer.current_segment_path().clone()
        };

        {
            let mut bytes = std::fs::read(&segment_path).unwrap();
            bytes[8] ^= 0xFF;
            std::fs::write(&segment_path, bytes).unwrap();
        }

        let result = ReplayPlanner::new(config).plan();
        assert!(matches!(result, Err(Error::WalReplay(_))));
    }

    #[test]
    fn test_discard_segments() {
        let (_temp_dir, config) = setup_test_wal();

        {
            let mut writer = WalWriter::new(
                &config.wal_dir,
                config.max_segment_entries,
                config.sync_mode,
            )
            .expect("Failed to create writer");
            writer
                .append(LogPayload::Create {
                    record: record("000000001"),
                })
                .expect("Failed to append");
        }

        let planner = ReplayPlanner::new(config.clone());
        planner.plan().expect("Failed to plan");
        let deleted = planner.discard_segments().expect("Failed to discard");
        assert_eq!(deleted, 1);

        let manager = SegmentManager::new(config.wal_dir.clone());
        assert_eq!(manager.segment_count().unwrap(), 0);
    }
}

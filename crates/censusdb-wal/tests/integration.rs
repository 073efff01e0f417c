// Integration tests for WAL basic functionality

mod common;

use common::{sample_record, WalTestFixture};
use censusdb_wal::{LogPayload, SyncMode, Wal, WalConfig};

fn config_for(fixture: &WalTestFixture) -> WalConfig {
    WalConfig {
        wal_dir: fixture.wal_dir().clone(),
        ..Default::default()
    }
}

#[test]
fn test_wal_open_and_close() {
    let fixture = WalTestFixture::new();

    let mut wal = Wal::new(config_for(&fixture));
    wal.open().expect("Failed to open WAL");
    wal.close().expect("Failed to close WAL");
}

#[test]
fn test_wal_append_creates_segment() {
    let fixture = WalTestFixture::new();

    let mut wal = Wal::new(config_for(&fixture));
    wal.open().expect("Failed to open WAL");

    let seq = wal
        .append(LogPayload::Create {
            record: sample_record("123456789"),
        })
        .expect("Failed to append entry");
    assert_eq!(seq, 1);

    wal.sync().expect("Failed to sync WAL");
    wal.close().expect("Failed to close WAL");

    let segments = fixture.list_segments();
    assert!(!segments.is_empty(), "Expected at least one WAL segment");
}

#[test]
fn test_wal_operation_then_commit() {
    let fixture = WalTestFixture::new();

    let mut wal = Wal::new(config_for(&fixture));
    wal.open().expect("Failed to open WAL");

    let seq = wal
        .append(LogPayload::Delete {
            record: sample_record("987654321"),
        })
        .expect("Failed to append operation");
    let commit_seq = wal.commit(seq).expect("Failed to append commit");

    assert!(commit_seq > seq);
    wal.close().expect("Failed to close");
}

#[test]
fn test_wal_rotation_after_entry_limit() {
    let fixture = WalTestFixture::new();

    let mut config = config_for(&fixture);
    config.max_segment_entries = 4;

    let mut wal = Wal::new(config);
    wal.open().expect("Failed to open WAL");

    for i in 0..10u64 {
        wal.append(LogPayload::Create {
            record: sample_record(&format!("{:09}", i)),
        })
        .expect("Failed to append");
    }
    wal.close().expect("Failed to close");

    let segments: Vec<_> = fixture
        .list_segments()
        .into_iter()
        .filter(|name| name.starts_with("wal-") && name.ends_with(".log"))
        .collect();
    assert_eq!(segments.len(), 3, "10 entries at 4 per segment");
}

#[test]
fn test_wal_different_sync_modes() {
    for sync_mode in [SyncMode::Sync, SyncMode::Async, SyncMode::None] {
        let fixture = WalTestFixture::new();

        let mut config = config_for(&fixture);
        config.sync_mode = sync_mode;

        let mut wal = Wal::new(config);
        wal.open().expect("Failed to open WAL");

        wal.append(LogPayload::Create {
            record: sample_record("000000042"),
        })
        .expect("Failed to append");

        wal.close().expect("Failed to close");
    }
}

#[test]
fn test_wal_sequences_resume_across_handles() {
    let fixture = WalTestFixture::new();

    {
        let mut wal = Wal::new(config_for(&fixture));
        wal.open().expect("Failed to open WAL");
        for i in 0..3u64 {
            wal.append(LogPayload::Create {
                record: sample_record(&format!("{:09}", i)),
            })
            .expect("Failed to append");
        }
        wal.close().expect("Failed to close");
    }

    let mut wal = Wal::new(config_for(&fixture));
    wal.open().expect("Failed to open WAL");
    let seq = wal
        .append(LogPayload::Create {
            record: sample_record("000000099"),
        })
        .expect("Failed to append");
    assert_eq!(seq, 4);
}

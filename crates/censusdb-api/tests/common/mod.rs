// Common test utilities for store integration tests

use censusdb::{Occupation, Record, RecordKey, State, Store, StoreConfig};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture owning a temporary data directory
pub struct StoreTestFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl StoreTestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("census");

        Self { temp_dir, data_dir }
    }

    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir.clone(),
            ..Default::default()
        }
    }

    pub fn open(&self) -> Store {
        Store::open(self.config()).expect("Failed to open store")
    }

    #[allow(dead_code)]
    pub fn wal_dir(&self) -> PathBuf {
        self.data_dir.join(censusdb::WAL_DIR)
    }

    #[allow(dead_code)]
    pub fn bucket_dir(&self) -> PathBuf {
        self.data_dir.join(censusdb::BUCKET_DIR)
    }

    #[allow(dead_code)]
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join(censusdb::INDEX_DIR)
    }
}

impl Default for StoreTestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
pub fn key(raw: &str) -> RecordKey {
    RecordKey::new(raw).expect("valid key")
}

pub fn record(raw_key: &str, state: State, occupation: Occupation) -> Record {
    Record::new(key(raw_key), state, occupation)
}

/// Verify every non-empty bucket file is sorted strictly ascending.
#[allow(dead_code)]
pub fn assert_buckets_sorted(bucket_dir: &Path) {
    let buckets = censusdb::BucketStore::open(bucket_dir).expect("Failed to open bucket store");
    for bucket in 0..censusdb::BUCKET_COUNT {
        let records = buckets.records(bucket).expect("Failed to read bucket");
        for pair in records.windows(2) {
            assert!(
                pair[0].key < pair[1].key,
                "bucket {} out of order: {} >= {}",
                bucket,
                pair[0].key,
                pair[1].key
            );
        }
    }
}

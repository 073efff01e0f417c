//! # CensusDB
//!
//! A single-writer, file-backed record store. Records are partitioned
//! into 1000 hash buckets (one sorted file per non-empty bucket), two
//! secondary indexes map attribute values to key sets, and a
//! segment-rotated write-ahead log undoes incomplete operations at
//! startup.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use censusdb::{Occupation, Record, RecordKey, State, Store, StoreConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open(StoreConfig {
//!         data_dir: "./census_data".into(),
//!         ..Default::default()
//!     })?;
//!
//!     let record = Record::new(
//!         RecordKey::new("123456789")?,
//!         State::California,
//!         Occupation::Engineer,
//!     );
//!     store.create(record)?;
//!
//!     if let Some(found) = store.get(&RecordKey::new("123456789")?)? {
//!         println!("{} works as {}", found.state, found.occupation);
//!     }
//!
//!     // Everyone currently filed under California
//!     let keys = store.lookup_state(State::California)?;
//!     println!("{} records", keys.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Durability
//!
//! Every mutation is logged before the bucket or index files change and
//! marked committed after all three are rewritten. Opening a store first
//! replays the log: operations without a commit marker are undone, so
//! the files only ever reflect fully completed operations.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, info};

pub mod logging;

// Re-export core types
pub use censusdb_core::{
    route, BucketId, Error, Occupation, Record, RecordKey, RecordPatch, Result, State,
    BUCKET_COUNT,
};

// WAL components
pub use censusdb_wal::{
    LogEntry, LogKind, LogPayload, ReplayPlan, ReplayPlanner, SegmentManager, SyncMode, Wal,
    WalConfig, WalReader, DEFAULT_SEGMENT_ENTRIES,
};

// Storage components
pub use censusdb_storage::{
    BucketSnapshot, BucketStore, IndexManager, IndexSnapshot, IndexedAttribute, BUCKET_DIR,
    INDEX_DIR,
};

/// Directory under the data root holding WAL segments
pub const WAL_DIR: &str = "wal";

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for opening a [`Store`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for buckets, indexes, and the WAL
    pub data_dir: PathBuf,
    /// WAL sync mode
    pub sync_mode: SyncMode,
    /// WAL entries per segment before rotation
    pub max_segment_entries: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./censusdb_data"),
            sync_mode: SyncMode::Sync,
            max_segment_entries: DEFAULT_SEGMENT_ENTRIES,
        }
    }
}

/// The record store handle.
///
/// Orchestrates the write-ahead log, the bucket store, and the secondary
/// index manager so that every mutation is crash-recoverable: log first,
/// mutate bucket, mutate both indexes, then mark the log entry committed.
pub struct Store {
    buckets: BucketStore,
    indexes: IndexManager,
    wal: Mutex<Wal>,
}

impl Store {
    /// Open a store, running WAL replay to completion first.
    ///
    /// Replay undoes every operation the previous process logged but
    /// never committed, then discards all segments. The store does not
    /// serve requests until this finishes.
    pub fn open(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let buckets = BucketStore::open(config.data_dir.join(BUCKET_DIR))?;
        let indexes = IndexManager::open(config.data_dir.join(INDEX_DIR))?;

        let mut wal = Wal::new(WalConfig {
            wal_dir: config.data_dir.join(WAL_DIR),
            sync_mode: config.sync_mode,
            max_segment_entries: config.max_segment_entries,
        });

        let plan = wal.plan_replay()?;
        if !plan.incomplete.is_empty() {
            info!(
                incomplete = plan.incomplete.len(),
                committed = plan.committed,
                "undoing operations from interrupted shutdown"
            );
            // Newest first: later operations may depend on earlier ones.
            for entry in plan.incomplete.iter().rev() {
                Self::undo(&buckets, &indexes, entry)?;
            }
        }
        if plan.segment_count > 0 {
            wal.discard_segments()?;
        }

        wal.open()?;

        Ok(Self {
            buckets,
            indexes,
            wal: Mutex::new(wal),
        })
    }

    /// Point lookup by primary key.
    pub fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        self.buckets.read(key)
    }

    /// Insert a new record.
    ///
    /// Fails with `DuplicateKey` if the key is already live; the store is
    /// left unchanged.
    pub fn create(&self, record: Record) -> Result<()> {
        if self.buckets.read(&record.key)?.is_some() {
            return Err(Error::DuplicateKey(record.key.to_string()));
        }

        debug!(key = %record.key, "create");
        let sequence = self.append(LogPayload::Create {
            record: record.clone(),
        })?;

        self.buckets.insert(record.clone())?;
        for attribute in IndexedAttribute::ALL {
            self.indexes
                .add(*attribute, &attribute.value_of(&record), &record.key)?;
        }

        self.commit(sequence)
    }

    /// Apply a partial update to a record's non-key attributes.
    ///
    /// Returns the updated record. Fails with `RecordNotFound` if the key
    /// is absent. A patch that changes nothing succeeds without touching
    /// disk.
    pub fn update(&self, key: &RecordKey, patch: RecordPatch) -> Result<Record> {
        let old = self
            .buckets
            .read(key)?
            .ok_or_else(|| Error::RecordNotFound(key.to_string()))?;

        if patch.apply(&old) == old {
            return Ok(old);
        }

        debug!(key = %key, "update");
        let sequence = self.append(LogPayload::Update {
            key: key.clone(),
            old: old.clone(),
            patch: patch.clone(),
        })?;

        let (_, new) = self.buckets.replace(key, &patch)?;
        for attribute in IndexedAttribute::ALL {
            let old_value = attribute.value_of(&old);
            let new_value = attribute.value_of(&new);
            if old_value != new_value {
                self.indexes.remove(*attribute, &old_value, key)?;
                self.indexes.add(*attribute, &new_value, key)?;
            }
        }

        self.commit(sequence)?;
        Ok(new)
    }

    /// Delete a record, returning it.
    ///
    /// Fails with `RecordNotFound` if the key is absent.
    pub fn delete(&self, key: &RecordKey) -> Result<Record> {
        let old = self
            .buckets
            .read(key)?
            .ok_or_else(|| Error::RecordNotFound(key.to_string()))?;

        debug!(key = %key, "delete");
        let sequence = self.append(LogPayload::Delete {
            record: old.clone(),
        })?;

        let removed = self.buckets.remove(key)?;
        for attribute in IndexedAttribute::ALL {
            self.indexes
                .remove(*attribute, &attribute.value_of(&old), key)?;
        }

        self.commit(sequence)?;
        Ok(removed)
    }

    /// Keys of all records currently holding the given state.
    pub fn lookup_state(&self, state: State) -> Result<Vec<RecordKey>> {
        self.indexes.lookup(IndexedAttribute::State, state.as_str())
    }

    /// Keys of all records currently holding the given occupation.
    pub fn lookup_occupation(&self, occupation: Occupation) -> Result<Vec<RecordKey>> {
        self.indexes
            .lookup(IndexedAttribute::Occupation, occupation.as_str())
    }

    /// Close the store, syncing the WAL.
    pub fn close(self) -> Result<()> {
        self.wal.lock().map_err(|_| Error::LockPoisoned)?.close()
    }

    fn append(&self, payload: LogPayload) -> Result<u64> {
        self.wal
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .append(payload)
    }

    fn commit(&self, sequence: u64) -> Result<()> {
        self.wal
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .commit(sequence)?;
        Ok(())
    }

    /// Undo one incomplete operation.
    ///
    /// The crash may have hit before, between, or after the bucket and
    /// index writes, so every step first checks what actually happened;
    /// the result is always the full pre-operation state.
    fn undo(buckets: &BucketStore, indexes: &IndexManager, entry: &LogEntry) -> Result<()> {
        match &entry.payload {
            LogPayload::Create { record } => {
                if buckets.read(&record.key)?.is_some() {
                    buckets.remove(&record.key)?;
                }
                for attribute in IndexedAttribute::ALL {
                    let value = attribute.value_of(record);
                    if indexes.contains(*attribute, &value, &record.key)? {
                        indexes.remove(*attribute, &value, &record.key)?;
                    }
                }
            }
            LogPayload::Delete { record } => {
                if buckets.read(&record.key)?.is_none() {
                    buckets.insert(record.clone())?;
                }
                for attribute in IndexedAttribute::ALL {
                    let value = attribute.value_of(record);
                    if !indexes.contains(*attribute, &value, &record.key)? {
                        indexes.add(*attribute, &value, &record.key)?;
                    }
                }
            }
            LogPayload::Update { key, old, patch } => {
                let new = patch.apply(old);
                match buckets.read(key)? {
                    Some(current) if current != *old => {
                        let restore = RecordPatch::new()
                            .state(old.state)
                            .occupation(old.occupation);
                        buckets.replace(key, &restore)?;
                    }
                    Some(_) => {}
                    None => buckets.insert(old.clone())?,
                }
                for attribute in IndexedAttribute::ALL {
                    let old_value = attribute.value_of(old);
                    let new_value = attribute.value_of(&new);
                    if old_value == new_value {
                        continue;
                    }
                    if indexes.contains(*attribute, &new_value, key)? {
                        indexes.remove(*attribute, &new_value, key)?;
                    }
                    if !indexes.contains(*attribute, &old_value, key)? {
                        indexes.add(*attribute, &old_value, key)?;
                    }
                }
            }
            // The replay plan never lists commit markers as incomplete
            LogPayload::Commit { .. } => {}
        }
        Ok(())
    }
}

//! Secondary index manager - attribute value to key-set mappings
//!
//! One index file per indexed attribute, each a versioned snapshot of
//! `value string -> ordered key set`. Like the bucket store, every
//! mutation rewrites the whole file under the attribute's lock, published
//! via temp-file rename. Index keys are the attributes' display strings so
//! the files stay self-describing.

use censusdb_core::format_version::{index_version, INDEX_FORMAT_VERSION};
use censusdb_core::{Error, Record, RecordKey, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The attributes CensusDB maintains secondary indexes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedAttribute {
    /// The record's state attribute
    State,
    /// The record's occupation attribute
    Occupation,
}

impl IndexedAttribute {
    /// Both indexed attributes, in lock order.
    pub const ALL: &'static [IndexedAttribute] =
        &[IndexedAttribute::State, IndexedAttribute::Occupation];

    /// The index file name for this attribute.
    pub fn file_name(&self) -> &'static str {
        match self {
            IndexedAttribute::State => "state.idx",
            IndexedAttribute::Occupation => "occupation.idx",
        }
    }

    /// The value a record currently holds for this attribute.
    pub fn value_of(&self, record: &Record) -> String {
        match self {
            IndexedAttribute::State => record.state.as_str().to_string(),
            IndexedAttribute::Occupation => record.occupation.as_str().to_string(),
        }
    }

    fn slot(&self) -> usize {
        match self {
            IndexedAttribute::State => 0,
            IndexedAttribute::Occupation => 1,
        }
    }
}

/// On-disk form of one index: a versioned value -> key-set mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Format version for compatibility checks
    pub version: u16,
    /// Attribute value -> keys currently holding that value
    pub entries: BTreeMap<String, BTreeSet<RecordKey>>,
}

impl IndexSnapshot {
    /// An empty current-version snapshot.
    pub fn empty() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Encode the snapshot for writing to an index file.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize index: {}", e)))
    }

    /// Decode an index file's bytes, validating the version.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let snapshot: IndexSnapshot = bincode::deserialize(bytes)
            .map_err(|e| Error::StorageCorruption(format!("Malformed index file: {}", e)))?;

        if !index_version().can_read(snapshot.version) {
            return Err(Error::StorageCorruption(format!(
                "Unsupported index format version {}",
                snapshot.version
            )));
        }

        Ok(snapshot)
    }
}

/// Owns the two secondary index files and serializes access per attribute.
pub struct IndexManager {
    dir: PathBuf,
    locks: [Mutex<()>; 2],
}

impl IndexManager {
    /// Open the manager rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            locks: [Mutex::new(()), Mutex::new(())],
        })
    }

    fn path_for(&self, attribute: IndexedAttribute) -> PathBuf {
        self.dir.join(attribute.file_name())
    }

    fn lock(&self, attribute: IndexedAttribute) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.locks[attribute.slot()]
            .lock()
            .map_err(|_| Error::LockPoisoned)
    }

    /// Load an index; an absent file is an empty index.
    fn load(&self, attribute: IndexedAttribute) -> Result<IndexSnapshot> {
        let path = self.path_for(attribute);
        if !path.exists() {
            return Ok(IndexSnapshot::empty());
        }

        let bytes = fs::read(&path)
            .map_err(|e| Error::StorageCorruption(format!("Unreadable index {:?}: {}", path, e)))?;

        IndexSnapshot::decode(&bytes)
    }

    /// Rewrite an index file wholesale.
    fn save(&self, attribute: IndexedAttribute, snapshot: &IndexSnapshot) -> Result<()> {
        let path = self.path_for(attribute);
        let bytes = snapshot.encode()?;

        let tmp_path = path.with_extension("idx.tmp");
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &path)?;

        Ok(())
    }

    /// Add `key` to the set for `value`.
    pub fn add(&self, attribute: IndexedAttribute, value: &str, key: &RecordKey) -> Result<()> {
        let _guard = self.lock(attribute)?;

        let mut snapshot = self.load(attribute)?;
        snapshot
            .entries
            .entry(value.to_string())
            .or_default()
            .insert(key.clone());
        self.save(attribute, &snapshot)
    }

    /// Remove `key` from the set for `value`.
    ///
    /// The pair must be present: removing an absent membership means a
    /// caller passed a value the record never held, which is a bug that
    /// must surface as `IndexInconsistency` rather than pass silently.
    pub fn remove(&self, attribute: IndexedAttribute, value: &str, key: &RecordKey) -> Result<()> {
        let _guard = self.lock(attribute)?;

        let mut snapshot = self.load(attribute)?;
        let removed = match snapshot.entries.get_mut(value) {
            Some(keys) => {
                let removed = keys.remove(key);
                if keys.is_empty() {
                    snapshot.entries.remove(value);
                }
                removed
            }
            None => false,
        };

        if !removed {
            return Err(Error::IndexInconsistency(format!(
                "key {} not indexed under {} {:?}",
                key,
                attribute.file_name(),
                value
            )));
        }

        self.save(attribute, &snapshot)
    }

    /// Whether `key` is currently indexed under `value`.
    pub fn contains(
        &self,
        attribute: IndexedAttribute,
        value: &str,
        key: &RecordKey,
    ) -> Result<bool> {
        let _guard = self.lock(attribute)?;

        let snapshot = self.load(attribute)?;
        Ok(snapshot
            .entries
            .get(value)
            .map(|keys| keys.contains(key))
            .unwrap_or(false))
    }

    /// All keys currently holding `value`, in ascending key order.
    pub fn lookup(&self, attribute: IndexedAttribute, value: &str) -> Result<Vec<RecordKey>> {
        let _guard = self.lock(attribute)?;

        let snapshot = self.load(attribute)?;
        Ok(snapshot
            .entries
            .get(value)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default())
    }
}

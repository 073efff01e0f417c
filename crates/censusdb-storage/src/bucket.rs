//! Bucket store - one sorted on-disk partition per hash bucket
//!
//! Each non-empty bucket is a single file holding its records sorted
//! strictly ascending by key; a missing file means the bucket is empty.
//! Every mutation is a full read-modify-write of the bucket file, done
//! under that bucket's lock and published with a temp-file rename so a
//! crash mid-rewrite never leaves a torn file.

use censusdb_core::format_version::{bucket_version, BUCKET_FORMAT_VERSION};
use censusdb_core::{route, BucketId, Error, Record, RecordKey, RecordPatch, Result, BUCKET_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// On-disk form of one bucket: a versioned snapshot of its sorted records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSnapshot {
    /// Format version for compatibility checks
    pub version: u16,
    /// Records sorted strictly ascending by key
    pub records: Vec<Record>,
}

impl BucketSnapshot {
    /// Wrap records in a current-version snapshot.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            version: BUCKET_FORMAT_VERSION,
            records,
        }
    }

    /// Encode the snapshot for writing to a bucket file.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize bucket: {}", e)))
    }

    /// Decode a bucket file's bytes, validating version and sort order.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let snapshot: BucketSnapshot = bincode::deserialize(bytes)
            .map_err(|e| Error::StorageCorruption(format!("Malformed bucket file: {}", e)))?;

        if !bucket_version().can_read(snapshot.version) {
            return Err(Error::StorageCorruption(format!(
                "Unsupported bucket format version {}",
                snapshot.version
            )));
        }

        let sorted = snapshot
            .records
            .windows(2)
            .all(|pair| pair[0].key < pair[1].key);
        if !sorted {
            return Err(Error::StorageCorruption(
                "Bucket records out of order".to_string(),
            ));
        }

        Ok(snapshot)
    }
}

/// Owns the bucket partition files and serializes access per bucket.
pub struct BucketStore {
    dir: PathBuf,
    locks: Vec<Mutex<()>>,
}

impl BucketStore {
    /// Open the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let locks = (0..BUCKET_COUNT).map(|_| Mutex::new(())).collect();

        Ok(Self { dir, locks })
    }

    fn path_for(&self, bucket: BucketId) -> PathBuf {
        self.dir.join(format!("bucket-{:04}.dat", bucket))
    }

    fn lock(&self, bucket: BucketId) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.locks[bucket as usize]
            .lock()
            .map_err(|_| Error::LockPoisoned)
    }

    /// Load a bucket's records; an absent file is an empty bucket.
    fn load(&self, bucket: BucketId) -> Result<Vec<Record>> {
        let path = self.path_for(bucket);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&path)
            .map_err(|e| Error::StorageCorruption(format!("Unreadable bucket {:?}: {}", path, e)))?;

        Ok(BucketSnapshot::decode(&bytes)?.records)
    }

    /// Rewrite a bucket file; an empty bucket removes the file.
    fn save(&self, bucket: BucketId, records: Vec<Record>) -> Result<()> {
        let path = self.path_for(bucket);

        if records.is_empty() {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            return Ok(());
        }

        let bytes = BucketSnapshot::new(records).encode()?;

        let tmp_path = path.with_extension("dat.tmp");
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &path)?;

        Ok(())
    }

    /// Point lookup by key.
    pub fn read(&self, key: &RecordKey) -> Result<Option<Record>> {
        let bucket = route(key);
        let _guard = self.lock(bucket)?;

        let records = self.load(bucket)?;
        Ok(records
            .binary_search_by(|r| r.key.cmp(key))
            .ok()
            .map(|i| records[i].clone()))
    }

    /// Insert a record at its sorted position.
    ///
    /// Fails with `DuplicateKey` if the key is already present; the file
    /// is left untouched.
    pub fn insert(&self, record: Record) -> Result<()> {
        let bucket = route(&record.key);
        let _guard = self.lock(bucket)?;

        let mut records = self.load(bucket)?;
        match records.binary_search_by(|r| r.key.cmp(&record.key)) {
            Ok(_) => Err(Error::DuplicateKey(record.key.to_string())),
            Err(position) => {
                records.insert(position, record);
                self.save(bucket, records)
            }
        }
    }

    /// Remove a record, returning it.
    ///
    /// Fails with `RecordNotFound` if the key is absent.
    pub fn remove(&self, key: &RecordKey) -> Result<Record> {
        let bucket = route(key);
        let _guard = self.lock(bucket)?;

        let mut records = self.load(bucket)?;
        match records.binary_search_by(|r| r.key.cmp(key)) {
            Ok(position) => {
                let removed = records.remove(position);
                self.save(bucket, records)?;
                Ok(removed)
            }
            Err(_) => Err(Error::RecordNotFound(key.to_string())),
        }
    }

    /// Overwrite a record's attributes in place.
    ///
    /// Returns the record before and after the patch. Fails with
    /// `RecordNotFound` if the key is absent.
    pub fn replace(&self, key: &RecordKey, patch: &RecordPatch) -> Result<(Record, Record)> {
        let bucket = route(key);
        let _guard = self.lock(bucket)?;

        let mut records = self.load(bucket)?;
        match records.binary_search_by(|r| r.key.cmp(key)) {
            Ok(position) => {
                let old = records[position].clone();
                let new = patch.apply(&old);
                records[position] = new.clone();
                self.save(bucket, records)?;
                Ok((old, new))
            }
            Err(_) => Err(Error::RecordNotFound(key.to_string())),
        }
    }

    /// All records currently in a bucket, in key order.
    pub fn records(&self, bucket: BucketId) -> Result<Vec<Record>> {
        let _guard = self.lock(bucket)?;
        self.load(bucket)
    }

    /// Whether a bucket currently has a partition file on disk.
    pub fn bucket_file_exists(&self, bucket: BucketId) -> bool {
        self.path_for(bucket).exists()
    }
}

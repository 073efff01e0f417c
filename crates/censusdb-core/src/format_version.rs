/// File format versions for CensusDB
///
/// Every on-disk structure embeds its format version so readers can refuse
/// files written by an incompatible release instead of misparsing them.
/// Bucket snapshot format version
pub const BUCKET_FORMAT_VERSION: u16 = 1;

/// Secondary index snapshot format version
pub const INDEX_FORMAT_VERSION: u16 = 1;

/// WAL segment format version
pub const WAL_FORMAT_VERSION: u16 = 1;

/// Version compatibility information
pub struct FormatVersion {
    /// Current version of this format
    pub current: u16,
    /// Minimum supported version for reading
    pub min_read: u16,
    /// Minimum supported version for writing
    pub min_write: u16,
}

impl FormatVersion {
    /// Check if a version can be read
    pub fn can_read(&self, version: u16) -> bool {
        version >= self.min_read && version <= self.current
    }

    /// Check if a version can be written
    pub fn can_write(&self, version: u16) -> bool {
        version >= self.min_write && version <= self.current
    }
}

/// Bucket snapshot format version info
pub fn bucket_version() -> FormatVersion {
    FormatVersion {
        current: BUCKET_FORMAT_VERSION,
        min_read: 1,
        min_write: 1,
    }
}

/// Index snapshot format version info
pub fn index_version() -> FormatVersion {
    FormatVersion {
        current: INDEX_FORMAT_VERSION,
        min_read: 1,
        min_write: 1,
    }
}

/// WAL format version info
pub fn wal_version() -> FormatVersion {
    FormatVersion {
        current: WAL_FORMAT_VERSION,
        min_read: 1,
        min_write: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_compatibility() {
        let v = bucket_version();
        assert!(v.can_read(1));
        assert!(v.can_write(1));
        assert!(!v.can_read(0));
        assert!(!v.can_read(999));
    }
}

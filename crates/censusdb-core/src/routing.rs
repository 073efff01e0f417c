//! Hash routing: mapping a record key to its bucket.
//!
//! The router is part of the on-disk contract: the bulk loader and the
//! runtime must place a key in the same bucket, across processes and
//! restarts. The algorithm is therefore fixed: CRC32 (IEEE polynomial, as
//! computed by `crc32fast`) over the key's UTF-8 bytes, reduced modulo the
//! bucket count.

use crate::record::RecordKey;

/// Total number of buckets a store is partitioned into.
pub const BUCKET_COUNT: u32 = 1000;

/// Identifier of a bucket, always in `[0, BUCKET_COUNT)`.
pub type BucketId = u32;

/// The bucket a key routes to.
pub fn route(key: &RecordKey) -> BucketId {
    crc32fast::hash(key.as_str().as_bytes()) % BUCKET_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_is_deterministic() {
        let key = RecordKey::new("123456789").unwrap();
        assert_eq!(route(&key), route(&key));

        let again = RecordKey::new("123456789").unwrap();
        assert_eq!(route(&key), route(&again));
    }

    #[test]
    fn test_route_stays_in_range() {
        for i in 0..500u32 {
            let key = RecordKey::new(format!("{:09}", i * 7919)).unwrap();
            assert!(route(&key) < BUCKET_COUNT);
        }
    }

    #[test]
    fn test_route_spreads_keys() {
        let mut seen = std::collections::HashSet::new();
        for i in 0..200u32 {
            let key = RecordKey::new(format!("{:09}", i)).unwrap();
            seen.insert(route(&key));
        }
        // 200 sequential keys should land in far more than a handful of
        // buckets if the hash distributes at all.
        assert!(seen.len() > 50, "only {} distinct buckets", seen.len());
    }
}

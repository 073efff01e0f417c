//! # CensusDB Storage
//!
//! The on-disk record storage for CensusDB: hash-partitioned bucket files
//! and the two secondary index files. Both follow the same persistence
//! policy — load the whole file, mutate in memory, rewrite atomically —
//! which keeps the external file contract identical to what the bulk
//! loader produces.
//!
//! This crate is an internal implementation detail of CensusDB. Depend on
//! the main `censusdb` crate instead, which provides the stable public
//! API.

pub mod bucket;
pub mod index;

pub use bucket::{BucketSnapshot, BucketStore};
pub use index::{IndexManager, IndexSnapshot, IndexedAttribute};

/// Directory under the data root holding bucket partition files
pub const BUCKET_DIR: &str = "buckets";

/// Directory under the data root holding secondary index files
pub const INDEX_DIR: &str = "index";

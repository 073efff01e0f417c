//! # CensusDB Core
//!
//! Core types for the CensusDB record store: the record model, key
//! validation, hash routing, file format versions, and the shared error
//! taxonomy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format_version;
pub mod record;
pub mod routing;

pub use error::{Error, Result};
pub use record::{Occupation, Record, RecordKey, RecordPatch, State};
pub use routing::{route, BucketId, BUCKET_COUNT};

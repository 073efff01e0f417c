//! Error types for CensusDB.

use std::fmt;

/// The main error type for CensusDB operations.
#[derive(Debug)]
pub enum Error {
    /// Create was called for a key that is already live
    DuplicateKey(String),

    /// Update or delete was called for a key that is not live
    RecordNotFound(String),

    /// A key failed 9-digit validation
    InvalidKey(String),

    /// A bucket or index file is unreadable or malformed
    StorageCorruption(String),

    /// An index removal targeted a key/value pair that is not present
    IndexInconsistency(String),

    /// A log entry could not be resolved during startup replay
    WalReplay(String),

    /// I/O error
    Io(std::io::Error),

    /// Serialization/deserialization error
    Serialization(String),

    /// Storage engine error
    Storage(String),

    /// A lock was poisoned (internal error)
    LockPoisoned,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateKey(key) => write!(f, "Duplicate key: {}", key),
            Error::RecordNotFound(key) => write!(f, "Record not found: {}", key),
            Error::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
            Error::StorageCorruption(msg) => write!(f, "Storage corruption: {}", msg),
            Error::IndexInconsistency(msg) => write!(f, "Index inconsistency: {}", msg),
            Error::WalReplay(msg) => write!(f, "WAL replay failed: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Storage(msg) => write!(f, "Storage error: {}", msg),
            Error::LockPoisoned => write!(f, "Lock poisoned"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// A specialized `Result` type for CensusDB operations.
pub type Result<T> = std::result::Result<T, Error>;

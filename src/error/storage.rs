// Preference storage error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Storage error code constants
///
/// Error code range: 4001-4004
pub struct StorageErrorCodes {}

impl StorageErrorCodes {
    /// Backing store could not be read
    pub const READ_FAILED: i32 = 4001;

    /// Backing store could not be written
    pub const WRITE_FAILED: i32 = 4002;

    /// Stored value could not be (de)serialized
    pub const SERIALIZATION: i32 = 4003;

    /// Store lock was poisoned
    pub const LOCK_POISONED: i32 = 4004;
}

/// Log a storage error as a warning.
///
/// Persistence is best-effort: in-memory state stays authoritative, so these
/// are never escalated.
pub fn log_storage_error(err: &StorageError, context: &str) {
    warn!(
        "Storage error in {}: code={}, component=PreferenceStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Key-value storage errors
///
/// Error code range: 4001-4004
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Read failed
    ReadFailed { reason: String },

    /// Write failed (quota, read-only filesystem, disabled storage)
    WriteFailed { reason: String },

    /// Value was not valid JSON for the expected shape
    Serialization { reason: String },

    /// Store lock poisoned
    LockPoisoned,
}

impl ErrorCode for StorageError {
    fn code(&self) -> i32 {
        match self {
            StorageError::ReadFailed { .. } => StorageErrorCodes::READ_FAILED,
            StorageError::WriteFailed { .. } => StorageErrorCodes::WRITE_FAILED,
            StorageError::Serialization { .. } => StorageErrorCodes::SERIALIZATION,
            StorageError::LockPoisoned => StorageErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            StorageError::ReadFailed { reason } => format!("Failed to read storage: {}", reason),
            StorageError::WriteFailed { reason } => {
                format!("Failed to write storage: {}", reason)
            }
            StorageError::Serialization { reason } => {
                format!("Invalid stored value: {}", reason)
            }
            StorageError::LockPoisoned => "Storage lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StorageError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StorageError {}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization {
            reason: err.to_string(),
        }
    }
}

// Error types for the ambient sound engine
//
// This module defines custom error types for output, asset and storage
// operations. Every error carries a numeric code for structured logging.
// None of them escape the public SoundEngine API.

mod asset;
mod audio;
mod storage;

pub use asset::{log_asset_error, AssetError, AssetErrorCodes};
pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use storage::{log_storage_error, StorageError, StorageErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error logging across
/// subsystems.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_trait() {
        let audio_err: &dyn ErrorCode = &AudioError::NotInitialized;
        assert_eq!(audio_err.code(), 1006);

        let asset_err: &dyn ErrorCode = &AssetError::EmptyBuffer;
        assert_eq!(asset_err.code(), 3004);

        let storage_err: &dyn ErrorCode = &StorageError::LockPoisoned;
        assert_eq!(storage_err.code(), 4004);
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), StorageError> {
            Err(StorageError::WriteFailed {
                reason: "quota".to_string(),
            })
        }

        fn caller() -> Result<(), StorageError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }
}

// Asset fetch/decode error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Asset error code constants
///
/// Error code range: 3001-3005
pub struct AssetErrorCodes {}

impl AssetErrorCodes {
    /// Transport-level fetch failure (network, missing file)
    pub const FETCH_FAILED: i32 = 3001;

    /// Server answered with a non-success status
    pub const HTTP_STATUS: i32 = 3002;

    /// Bytes could not be decoded into PCM
    pub const DECODE_FAILED: i32 = 3003;

    /// Decoded asset holds no samples
    pub const EMPTY_BUFFER: i32 = 3004;

    /// Name outside the fixed category/cue enumeration
    pub const UNKNOWN_KIND: i32 = 3005;
}

/// Log an asset error as a warning.
///
/// Asset failures are recovered by procedural synthesis, so they are never
/// logged at error level.
pub fn log_asset_error(err: &AssetError, url: &str) {
    warn!(
        "Asset unavailable: url={}, code={}, component=AssetCache, message={}",
        url,
        err.code(),
        err.message()
    );
}

/// Asset loading errors
///
/// Error code range: 3001-3005
#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    /// Fetch failed before a response arrived
    FetchFailed { url: String, reason: String },

    /// Non-success status code
    HttpStatus { url: String, status: u16 },

    /// Decoding failed
    DecodeFailed { reason: String },

    /// Decoded asset is empty
    EmptyBuffer,

    /// Unknown category or cue name
    UnknownKind { name: String },
}

impl ErrorCode for AssetError {
    fn code(&self) -> i32 {
        match self {
            AssetError::FetchFailed { .. } => AssetErrorCodes::FETCH_FAILED,
            AssetError::HttpStatus { .. } => AssetErrorCodes::HTTP_STATUS,
            AssetError::DecodeFailed { .. } => AssetErrorCodes::DECODE_FAILED,
            AssetError::EmptyBuffer => AssetErrorCodes::EMPTY_BUFFER,
            AssetError::UnknownKind { .. } => AssetErrorCodes::UNKNOWN_KIND,
        }
    }

    fn message(&self) -> String {
        match self {
            AssetError::FetchFailed { url, reason } => {
                format!("Failed to fetch {}: {}", url, reason)
            }
            AssetError::HttpStatus { url, status } => {
                format!("Fetching {} returned status {}", url, status)
            }
            AssetError::DecodeFailed { reason } => {
                format!("Failed to decode audio: {}", reason)
            }
            AssetError::EmptyBuffer => "Decoded audio contains no samples".to_string(),
            AssetError::UnknownKind { name } => {
                format!("Unknown sound name: {}", name)
            }
        }
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AssetError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AssetError {}

impl From<hound::Error> for AssetError {
    fn from(err: hound::Error) -> Self {
        AssetError::DecodeFailed {
            reason: err.to_string(),
        }
    }
}

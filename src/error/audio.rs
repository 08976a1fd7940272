// Audio output error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes carried by [`AudioError`].
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Output context could not be constructed
    pub const INITIALIZATION_FAILED: i32 = 1001;

    /// Output device stream could not be opened
    pub const STREAM_OPEN_FAILED: i32 = 1002;

    /// Device only offers a sample format the graph cannot render into
    pub const UNSUPPORTED_SAMPLE_FORMAT: i32 = 1003;

    /// Operation attempted on a closed output context
    pub const CONTEXT_CLOSED: i32 = 1004;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1005;

    /// Audio graph has not been initialized yet
    pub const NOT_INITIALIZED: i32 = 1006;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=SoundEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio output errors
///
/// These errors cover construction and control of the output context and
/// the device stream feeding it. None of them reach callers of
/// `SoundEngine`; they are logged and the engine degrades to silence.
///
/// Error code range: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Output context could not be constructed
    InitializationFailed { reason: String },

    /// Failed to open the device stream
    StreamOpenFailed { reason: String },

    /// Device sample format is not f32
    UnsupportedSampleFormat { format: String },

    /// Output context was already closed
    ContextClosed,

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Graph not initialized
    NotInitialized,
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::InitializationFailed { .. } => AudioErrorCodes::INITIALIZATION_FAILED,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::UnsupportedSampleFormat { .. } => {
                AudioErrorCodes::UNSUPPORTED_SAMPLE_FORMAT
            }
            AudioError::ContextClosed => AudioErrorCodes::CONTEXT_CLOSED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::NotInitialized => AudioErrorCodes::NOT_INITIALIZED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::InitializationFailed { reason } => {
                format!("Failed to initialize audio output: {}", reason)
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::UnsupportedSampleFormat { format } => {
                format!("Unsupported output sample format: {}", format)
            }
            AudioError::ContextClosed => "Audio output context already closed".to_string(),
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::NotInitialized => {
                "Audio graph not initialized. Call initialize() first.".to_string()
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

//! Error handling for nsndfile
//!
//! Every failure the binding can produce is a variant of [`SndError`].
//! Precondition failures are detected before any native call is made;
//! native failures carry the status or error code libsndfile returned.

use thiserror::Error;

use crate::command::Command;

/// Result type alias for nsndfile operations
pub type Result<T> = std::result::Result<T, SndError>;

/// Main error type for nsndfile operations
#[derive(Error, Debug)]
pub enum SndError {
    // Precondition Errors
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Argument '{name}' is null or empty")]
    NullArgument { name: &'static str },

    #[error("Argument '{name}' out of range: {value} ({expected})")]
    OutOfRange {
        name: &'static str,
        value: i64,
        expected: &'static str,
    },

    // Command Errors
    #[error("Native command {command:?} failed with status {status}")]
    CommandFailed { command: Command, status: i32 },

    #[error("Unexpected result from command {command:?}: {reason}")]
    UnexpectedResult { command: Command, reason: String },

    // Memory Errors
    #[error("Buffer too small: {required} bytes required, {capacity} available")]
    Bounds { required: usize, capacity: usize },

    #[error("Out of memory: failed to allocate {bytes} bytes")]
    OutOfMemory { bytes: usize },

    // Native Errors
    #[error("libsndfile error {code}: {message}")]
    Native { code: i32, message: String },

    #[error("Failed to load libsndfile: {reason}")]
    LibraryLoad {
        reason: String,
        #[source]
        source: Option<libloading::Error>,
    },

    #[error("Symbol '{symbol}' not found in libsndfile")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    // Ambient Errors
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SndError {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        SndError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(name: &'static str, value: i64, expected: &'static str) -> Self {
        SndError::OutOfRange {
            name,
            value,
            expected,
        }
    }

    pub(crate) fn unexpected(command: Command, reason: impl Into<String>) -> Self {
        SndError::UnexpectedResult {
            command,
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SndError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            SndError::NullArgument { .. } => "NULL_ARGUMENT",
            SndError::OutOfRange { .. } => "OUT_OF_RANGE",
            SndError::CommandFailed { .. } => "COMMAND_FAILED",
            SndError::UnexpectedResult { .. } => "UNEXPECTED_RESULT",
            SndError::Bounds { .. } => "BOUNDS",
            SndError::OutOfMemory { .. } => "OUT_OF_MEMORY",
            SndError::Native { .. } => "NATIVE_ERROR",
            SndError::LibraryLoad { .. } => "LIBRARY_LOAD",
            SndError::MissingSymbol { .. } => "MISSING_SYMBOL",
            SndError::Wav(_) => "WAV_ERROR",
            SndError::Config(_) => "CONFIG_ERROR",
            SndError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the error is a rejected argument, raised before any native call
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            SndError::InvalidArgument { .. }
                | SndError::NullArgument { .. }
                | SndError::OutOfRange { .. }
        )
    }

    /// The native status or error code carried by this error, if any
    pub fn native_status(&self) -> Option<i32> {
        match self {
            SndError::CommandFailed { status, .. } => Some(*status),
            SndError::Native { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SndError::NullArgument { name: "buffer" };
        assert_eq!(err.error_code(), "NULL_ARGUMENT");

        let err = SndError::CommandFailed {
            command: Command::GetSignalMax,
            status: -1,
        };
        assert_eq!(err.error_code(), "COMMAND_FAILED");
    }

    #[test]
    fn test_caller_errors() {
        assert!(SndError::invalid_argument("sndfile", "handle must be valid").is_caller_error());
        assert!(SndError::out_of_range("items", -1, "items >= 0").is_caller_error());
        assert!(!SndError::unexpected(Command::GetSignalMax, "empty result").is_caller_error());
    }

    #[test]
    fn test_native_status() {
        let err = SndError::CommandFailed {
            command: Command::GetMaxAllChannels,
            status: -3,
        };
        assert_eq!(err.native_status(), Some(-3));
        assert_eq!(SndError::OutOfMemory { bytes: 8 }.native_status(), None);
    }

    #[test]
    fn test_display_mentions_argument() {
        let err = SndError::invalid_argument("sndfile", "handle must be valid");
        assert_eq!(
            err.to_string(),
            "Invalid argument 'sndfile': handle must be valid"
        );
    }
}

//! Error handling for the fetal ECG framework
//!
//! Every failure the core can report is a local, recoverable condition. None of
//! these variants is meant to terminate the host process.

use core::fmt;

/// Result type alias for framework operations
pub type FecgResult<T> = Result<T, FecgError>;

/// Error type for all framework operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FecgError {
    /// Two buffers that must line up sample-for-sample do not
    ShapeMismatch {
        /// Samples per channel in the combined recording
        combined: usize,
        /// Samples per channel in the maternal reference
        maternal: usize,
    },

    /// Channel offset does not address a channel of the buffer
    ChannelOutOfRange {
        /// Requested channel offset
        channel: usize,
        /// Channels present in the buffer
        channel_count: usize,
    },

    /// Recording metadata or buffer contents are inconsistent
    InvalidRecordingConfig {
        /// Description of the problem
        reason: String,
    },

    /// Scan rate outside the supported range
    InvalidScanRate {
        /// Provided scan rate in Hz
        rate: u32,
        /// Valid range description
        valid_range: String,
    },

    /// Channel count outside the supported range
    InvalidChannelCount {
        /// Provided channel count
        count: usize,
        /// Maximum supported channel count
        max: usize,
    },

    /// Raw recording bytes could not be decoded
    FormatError {
        /// Description of format issue
        reason: String,
    },

    /// Monitor configuration is invalid
    ConfigurationError {
        /// Description of the configuration error
        message: String,
    },

    /// Synthetic recording generation failed
    SynthesisError {
        /// Description of the synthesis failure
        message: String,
    },
}

impl fmt::Display for FecgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FecgError::ShapeMismatch { combined, maternal } => {
                write!(f, "Shape mismatch: combined recording has {} samples per channel, maternal reference has {}",
                       combined, maternal)
            }
            FecgError::ChannelOutOfRange { channel, channel_count } => {
                write!(f, "Channel {} out of range for buffer with {} channels",
                       channel, channel_count)
            }
            FecgError::InvalidRecordingConfig { reason } => {
                write!(f, "Invalid recording configuration: {}", reason)
            }
            FecgError::InvalidScanRate { rate, valid_range } => {
                write!(f, "Invalid scan rate {}Hz, valid range: {}", rate, valid_range)
            }
            FecgError::InvalidChannelCount { count, max } => {
                write!(f, "Invalid channel count {}, must be between 1 and {}", count, max)
            }
            FecgError::FormatError { reason } => {
                write!(f, "Format error: {}", reason)
            }
            FecgError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            FecgError::SynthesisError { message } => {
                write!(f, "Synthesis error: {}", message)
            }
        }
    }
}

impl std::error::Error for FecgError {}

/// Convenience macro for creating format errors
#[macro_export]
macro_rules! format_error {
    ($($arg:tt)+) => {
        $crate::error::FecgError::FormatError {
            reason: format!($($arg)+),
        }
    };
}

//! Error handling for psyphys
//!
//! One error type covers every failure a processing unit can hit. None of
//! them is fatal to a batch: the caller logs the failure and moves on to the
//! next (participant, condition) unit.

use core::fmt;

/// Result type alias for psyphys operations
pub type PsyResult<T> = Result<T, PsyError>;

/// Error type for all psyphys operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PsyError {
    /// Malformed filter, threshold, distance or signal configuration
    InvalidParameter {
        /// Description of the offending parameter
        reason: String,
    },

    /// Zero-length input where at least one sample is required
    EmptySignal {
        /// Processing stage that received the empty input
        stage: &'static str,
    },

    /// Filtering produced a non-finite value
    FilterInstability {
        /// Processing stage that produced the value
        stage: &'static str,
        /// Index of the first non-finite output sample
        index: usize,
    },

    /// Component outputs that must be aligned differ in length
    MisalignedLength {
        /// Length of the reference sequence
        expected: usize,
        /// Length actually produced
        actual: usize,
    },

    /// Reading an input recording failed
    Io {
        /// Description of the I/O failure
        reason: String,
    },

    /// An input recording could not be parsed
    Parse {
        /// 1-based line number of the offending row
        line: usize,
        /// Description of the parse failure
        reason: String,
    },
}

impl PsyError {
    /// Shorthand for building an [`PsyError::InvalidParameter`]
    pub fn invalid(reason: impl Into<String>) -> Self {
        PsyError::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Short machine-friendly label, used as the failure kind in result tables
    pub fn kind(&self) -> &'static str {
        match self {
            PsyError::InvalidParameter { .. } => "InvalidParameter",
            PsyError::EmptySignal { .. } => "EmptySignal",
            PsyError::FilterInstability { .. } => "FilterInstability",
            PsyError::MisalignedLength { .. } => "MisalignedLength",
            PsyError::Io { .. } => "Io",
            PsyError::Parse { .. } => "Parse",
        }
    }
}

impl fmt::Display for PsyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsyError::InvalidParameter { reason } => {
                write!(f, "Invalid parameter: {}", reason)
            }
            PsyError::EmptySignal { stage } => {
                write!(f, "Empty signal passed to {}", stage)
            }
            PsyError::FilterInstability { stage, index } => {
                write!(f, "Filter instability in {}: non-finite output at sample {}",
                       stage, index)
            }
            PsyError::MisalignedLength { expected, actual } => {
                write!(f, "Misaligned length: expected {} samples, got {}",
                       expected, actual)
            }
            PsyError::Io { reason } => {
                write!(f, "I/O error: {}", reason)
            }
            PsyError::Parse { line, reason } => {
                write!(f, "Parse error at line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for PsyError {}

impl From<std::io::Error> for PsyError {
    fn from(err: std::io::Error) -> Self {
        PsyError::Io {
            reason: err.to_string(),
        }
    }
}

/// Convenience macro for creating parameter errors
#[macro_export]
macro_rules! invalid_param {
    ($($arg:tt)*) => {
        $crate::error::PsyError::InvalidParameter {
            reason: format!($($arg)*),
        }
    };
}

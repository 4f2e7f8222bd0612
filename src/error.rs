//! Error types for the tabular codec

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised by the spreadsheet and delimited-text codecs
///
/// An empty record set is not an error. Writers report it through
/// [`crate::types::WriteOutcome::Empty`].
#[derive(Error, Debug)]
pub enum CodecError {
    /// Malformed configuration or record set shape, raised before any I/O
    #[error("Validation failed: {}", .issues.join("; "))]
    Validation {
        /// One entry per failing field
        issues: Vec<String>,
    },

    /// Missing source file, sheet or header row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal fault while producing artifact bytes
    #[error("Serialization failed while {stage}: {message}")]
    Serialization {
        /// Which part of the artifact was being produced
        stage: &'static str,
        /// Underlying cause
        message: String,
    },

    /// Malformed source content
    #[error("Read error: {0}")]
    ReadError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP container error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl CodecError {
    /// Build a validation error from a list of issues
    pub fn validation<I, S>(issues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CodecError::Validation {
            issues: issues.into_iter().map(Into::into).collect(),
        }
    }

    /// Wrap any lower-level fault as a serialization failure for `stage`
    ///
    /// Validation errors pass through untouched so callers still see every failing field.
    pub(crate) fn into_serialization(self, stage: &'static str) -> Self {
        match self {
            CodecError::Validation { .. } | CodecError::Serialization { .. } => self,
            other => CodecError::Serialization {
                stage,
                message: other.to_string(),
            },
        }
    }

    /// Attach file context to read-side faults
    ///
    /// IO and container faults become [`CodecError::ReadError`]; read errors gain the
    /// context as a prefix. Other variants pass through.
    pub(crate) fn into_read_error(self, context: &str) -> Self {
        match self {
            CodecError::Io(e) => CodecError::ReadError(format!("{}: {}", context, e)),
            CodecError::Zip(e) => CodecError::ReadError(format!("{}: {}", context, e)),
            CodecError::ReadError(msg) => CodecError::ReadError(format!("{}: {}", context, msg)),
            other => other,
        }
    }

    /// Returns true for [`CodecError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CodecError::NotFound(_))
    }

    /// Returns true for [`CodecError::Validation`]
    pub fn is_validation(&self) -> bool {
        matches!(self, CodecError::Validation { .. })
    }
}

//! Error types for TenderScan.
//!
//! Library crates use [`TenderScanError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! A label that never appears in a document is not an error: it surfaces as
//! an absent field and flows into the record as an empty string.

use std::path::PathBuf;

/// Top-level error type for all TenderScan operations.
#[derive(Debug, thiserror::Error)]
pub enum TenderScanError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Table grids or content could not be read from one document.
    #[error("source read error at {path:?}: {message}")]
    SourceRead { path: PathBuf, message: String },

    /// Destination store unreachable or a write was rejected.
    #[error("storage error: {0}")]
    Storage(String),

    /// Destination store could not be opened or initialized at all.
    #[error("setup error: {0}")]
    Setup(String),

    /// Document-to-text conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TenderScanError>;

impl TenderScanError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a source read error for a document.
    pub fn source_read(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::SourceRead {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole run rather than one document.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_) | Self::Config { .. })
    }
}

//! Error types for formscribe.
//!
//! Library crates use [`FormscribeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Field lookups that miss and writes that fail are not errors: they are
//! reported as `None` / `false` by the page layer and folded into the
//! description fallback by the distributor.

use std::path::PathBuf;

/// Top-level error type for all formscribe operations.
#[derive(Debug, thiserror::Error)]
pub enum FormscribeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The generation endpoint could not be reached.
    #[error("request failed: {0}")]
    Network(String),

    /// The generation endpoint answered with a non-success status.
    #[error("network response was not ok: {status} {reason}")]
    Status { status: u16, reason: String },

    /// No response arrived within the configured window.
    #[error("API request timed out after {after_ms} ms. Please try again.")]
    Timeout { after_ms: u64 },

    /// Response body or content could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad selector table, unknown platform, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The source field was missing or blank when a generation was requested.
    #[error("Please add a {field} first")]
    EmptySource { field: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FormscribeError>;

impl FormscribeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// Whether this error belongs to the transport class (network, status, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Status { .. } | Self::Timeout { .. }
        )
    }
}

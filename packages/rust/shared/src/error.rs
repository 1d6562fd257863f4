//! Error types for feedcollector.
//!
//! Library crates use [`CollectorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-item resolution failures are a separate type, [`FetchError`]: they are
//! recovered at the fan-out boundary and never become a [`CollectorError`].

use std::path::PathBuf;

/// Top-level error type for everything that can abort a run.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The upstream feed could not be fetched or parsed.
    #[error("feed unavailable: {0}")]
    FeedUnavailable(String),

    /// Persisted state exists but could not be decoded.
    #[error("cannot read stored collection at {path:?}: {message}")]
    StorageRead { path: PathBuf, message: String },

    /// Persisted state could not be written.
    #[error("cannot write stored collection at {path:?}: {source}")]
    StorageWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Markdown rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CollectorError>;

impl CollectorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a storage read error for `path`.
    pub fn storage_read(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::StorageRead {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` raised while persisting state.
    pub fn storage_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageWrite {
            path: path.into(),
            source,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure to resolve a single link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Connection, DNS, TLS, timeout or redirect failure.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The server answered with a non-success status code.
    #[error("bad status: HTTP {0}")]
    BadStatus(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CollectorError::config("missing feed URL");
        assert_eq!(err.to_string(), "config error: missing feed URL");

        let err = CollectorError::storage_read("data.json", "expected value at line 1");
        assert!(err.to_string().contains("data.json"));
        assert!(err.to_string().contains("expected value"));
    }

    #[test]
    fn fetch_error_display() {
        assert_eq!(FetchError::BadStatus(404).to_string(), "bad status: HTTP 404");
        assert!(
            FetchError::Unreachable("connection refused".into())
                .to_string()
                .contains("connection refused")
        );
    }
}

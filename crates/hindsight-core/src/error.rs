//! Error types for the hindsight crates.
//!
//! The split mirrors how failures are handled: configuration and mirror-root
//! errors abort startup, per-archive errors are logged and retried on the next
//! refresh cycle, and shutdown errors are logged and swallowed so cleanup
//! always runs to completion.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the hindsight core.
#[derive(Debug, Error)]
pub enum MirrorError {
    // Configuration errors; fatal at startup
    #[error("Configuration error: {message}")]
    Config { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Remote listing/fetch errors; recoverable per identifier
    #[error("Network error: {message}")]
    Network {
        message: String,
        status: Option<u16>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Malformed archive identifiers or bundle entry paths
    #[error("Invalid archive data: {message}")]
    InvalidArchive { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    // Failures during the stop sequence; logged, never escalated
    #[error("Shutdown error: {message}")]
    Shutdown { message: String },
}

/// Result type alias for hindsight operations.
pub type Result<T> = std::result::Result<T, MirrorError>;

impl From<std::io::Error> for MirrorError {
    fn from(err: std::io::Error) -> Self {
        MirrorError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MirrorError {
    fn from(err: reqwest::Error) -> Self {
        MirrorError::Network {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}

impl MirrorError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MirrorError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        MirrorError::Config {
            message: message.into(),
        }
    }

    /// Whether this error aborts startup rather than being retried.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(self, MirrorError::Config { .. } | MirrorError::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MirrorError::config("no usable archive locations");
        assert_eq!(
            err.to_string(),
            "Configuration error: no usable archive locations"
        );
    }

    #[test]
    fn test_io_error_keeps_path() {
        let err = MirrorError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            "/var/mirror",
        );
        match err {
            MirrorError::Io { path, .. } => {
                assert_eq!(path, Some(PathBuf::from("/var/mirror")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_startup_fatality() {
        assert!(MirrorError::config("x").is_fatal_at_startup());
        assert!(!MirrorError::Cancelled.is_fatal_at_startup());
        assert!(!MirrorError::Network {
            message: "unreachable".into(),
            status: None
        }
        .is_fatal_at_startup());
    }
}

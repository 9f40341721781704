//! Error type definitions for the photo camera

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem errors while preparing the config file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Gallery snapshot specific errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Reading, writing or renaming the snapshot file failed
    #[error("Snapshot I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a valid snapshot document
    #[error("Corrupt snapshot {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot was written by an incompatible format version
    #[error("Unsupported snapshot version {found} in {} (expected {expected})", .path.display())]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// A stored key does not match the hash of its url
    #[error("Snapshot {} contains key {key} that does not match its url", .path.display())]
    KeyMismatch { path: PathBuf, key: String },
}

/// Image fetch specific errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Non-success HTTP status
    #[error("{url} did not return a valid image | Response: {status}")]
    Status { url: String, status: u16 },

    /// Request exceeded the configured timeout
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Connection, TLS or body read failures
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The url is not an absolute http(s) URL
    #[error("Invalid image URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl SnapshotError {
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the snapshot should be treated as absent rather than fatal
    pub fn is_unreadable_content(&self) -> bool {
        matches!(
            self,
            Self::Corrupt { .. } | Self::UnsupportedVersion { .. } | Self::KeyMismatch { .. }
        )
    }
}

impl FetchError {
    /// Map a reqwest failure onto the fetch taxonomy
    pub fn from_reqwest<S: Into<String>>(url: S, error: reqwest::Error) -> Self {
        let url = url.into();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if let Some(status) = error.status() {
            Self::Status {
                url,
                status: status.as_u16(),
            }
        } else {
            Self::Transport {
                url,
                message: error.to_string(),
            }
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Transport { url, .. }
            | Self::InvalidUrl { url, .. } => url,
        }
    }
}

//! Error types for song-finder
//!
//! This module provides the error handling for the library:
//! - The crate-wide [`Error`] enum and [`Result`] alias
//! - [`DownloadErrorReason`], the serializable reason carried by
//!   [`Event::DownloadError`](crate::types::Event::DownloadError)
//! - Machine-readable error codes for hosts that forward failures as JSON

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::types::LinkState;

/// Result type alias for song-finder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for song-finder
///
/// Each variant includes enough context to diagnose the failure without
/// consulting the logs.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "prefetch_count")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error while talking to the search site
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The web query backend could not answer a request
    #[error("backend error: {0}")]
    Backend(String),

    /// A fetch completion came back for a different link than the one dispatched.
    ///
    /// This is a bookkeeping bug, not a transient condition; the search that
    /// observes it stops.
    #[error("fetch result for {received} delivered to request for {expected}")]
    ProtocolViolation {
        /// The link the fetch was dispatched for
        expected: String,
        /// The link the result claims to answer
        received: String,
    },

    /// A link record was asked to move backwards through its states
    #[error("link {url} cannot move from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Url of the link whose record rejected the transition
        url: String,
        /// Current state of the record
        from: LinkState,
        /// Requested state
        to: LinkState,
    },

    /// External tool execution failed (youtube-dl, yt-dlp)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// The audio extraction tool could not be located
    #[error("audio extraction tool not found: {0}")]
    ToolNotFound(PathBuf),

    /// Link or download not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - the service no longer accepts commands
    #[error("shutdown in progress: not accepting new commands")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Machine-readable error code (e.g., "config_error", "protocol_violation")
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Backend(_) => "backend_error",
            Error::ProtocolViolation { .. } => "protocol_violation",
            Error::InvalidStateTransition { .. } => "invalid_state_transition",
            Error::ExternalTool(_) => "external_tool_error",
            Error::ToolNotFound(_) => "tool_not_found",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }

    /// Whether this error means the component that raised it can no longer run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProtocolViolation { .. } | Error::InvalidStateTransition { .. }
        )
    }

    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Why a download job ended without success
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadErrorReason {
    /// The job ran longer than the configured timeout and was killed
    Timeout,
    /// The tool exited with a non-zero status (`None` when killed by a signal)
    NonZeroExit {
        /// Exit code reported by the operating system
        code: Option<i32>,
    },
    /// The tool could not be started at all
    SpawnFailed {
        /// Error reported by the operating system
        message: String,
    },
    /// The process status could not be queried
    ProcessError {
        /// Error reported while polling the process
        message: String,
    },
}

impl std::fmt::Display for DownloadErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadErrorReason::Timeout => write!(f, "timed out"),
            DownloadErrorReason::NonZeroExit { code: Some(code) } => {
                write!(f, "exited with status {}", code)
            }
            DownloadErrorReason::NonZeroExit { code: None } => {
                write!(f, "terminated by signal")
            }
            DownloadErrorReason::SpawnFailed { message } => {
                write!(f, "failed to start: {}", message)
            }
            DownloadErrorReason::ProcessError { message } => {
                write!(f, "process error: {}", message)
            }
        }
    }
}

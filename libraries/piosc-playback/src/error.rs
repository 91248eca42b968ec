//! Error types for the playback control core

use std::path::PathBuf;
use thiserror::Error;

/// Playback control errors
///
/// None of these are fatal to the daemon. The router logs them and drops the
/// command that caused them.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Command name is not in the dispatch table
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Command arrived without a required argument
    #[error("Missing argument for {command}: expected {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    /// Argument was present but unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested video is not a regular file in the media directory
    #[error("Video file not found: {0:?}")]
    NotFound(PathBuf),

    /// An external executable could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external executable ran but reported failure
    #[error("{program} exited unsuccessfully: {detail}")]
    ToolFailed { program: String, detail: String },

    /// The playback service task is no longer running
    #[error("Playback service is not running")]
    ServiceClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

//! Error types for readahead-player
//!
//! Errors returned synchronously to control-side callers. Failures that happen
//! on the background reader are never returned from a transport call; they are
//! published as events and kept in the controller's last-error slot.

use thiserror::Error;

/// Main error type for the player crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Seek target lies beyond the known end of the file
    #[error("Invalid seek: frame {offset} is beyond file length {length}")]
    InvalidSeek {
        /// Requested frame offset
        offset: u64,
        /// Known file length in frames
        length: u64,
    },

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] readahead_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the player Error
pub type Result<T> = std::result::Result<T, Error>;

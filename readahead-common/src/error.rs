//! Common error types for readahead

use thiserror::Error;

/// Common result type for readahead operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the readahead crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

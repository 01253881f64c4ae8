//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A value could not be turned into a ring entity (e.g. a "missing"
    /// address sentinel, or an identifier of the wrong width).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Configuration rejected by validation.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    /// Configuration file could not be read or parsed.
    #[error("Config load failed: {0}")]
    ConfigLoad(String),
}

//! Error types for the leveret session layer.

use std::error::Error as StdError;
use std::fmt;
use std::result;

use crate::engine::EngineError;

/// A specialized Result type for leveret operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for leveret operations.
#[derive(Debug)]
pub enum Error {
    /// Engine-level failures, translated at the session boundary.
    ///
    /// Every failure raised by the learning engine (parse failure, seeding
    /// failure, internal invariant violation) collapses into this variant
    /// with the engine's original diagnostic preserved.
    Engine(String),
    /// Configuration errors
    Config(String),
    /// I/O errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Operation attempted on a session that has already been closed
    SessionClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Engine(msg) => write!(f, "Engine error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::SessionClosed => write!(f, "Session is closed"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Error::Engine(err.message().to_string())
    }
}

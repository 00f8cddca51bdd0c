//! Error types for the gesture stream library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A sample or probability vector had the wrong number of channels
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// Invalid construction parameters (cutoff above Nyquist, zero windows, ...)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Degenerate numeric input, e.g. a zero-norm quaternion
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed line in a recorded stream
    #[error("Parse error: {0}")]
    ParseError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

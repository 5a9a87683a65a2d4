//! Error types for the face anchor library.

use crate::renderer::AnchorHandle;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// The renderer no longer knows the anchor behind this handle
    #[error("Stale anchor handle: {0}")]
    StaleHandle(AnchorHandle),

    /// Face detector failed on a frame
    #[error("Face detector error: {0}")]
    Detector(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Runtime or worker thread could not be started
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

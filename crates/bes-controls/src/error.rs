//! Error types for controller operations.

use thiserror::Error;

/// Result type for controller operations.
pub type ControlResult<T> = Result<T, ControlError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a controller constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A restart blob does not have the size this controller writes.
    #[error("Restart blob for {controller} controller has {actual} bytes, expected {expected}")]
    BlobSize {
        controller: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A restart blob contains a value the controller cannot hold.
    #[error("Restart blob for {controller} controller is corrupt: {what}")]
    CorruptBlob {
        controller: &'static str,
        what: &'static str,
    },
}

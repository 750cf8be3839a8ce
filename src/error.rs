//! Global error handling for obliterate
//!
//! This module provides a centralized error type that can represent errors
//! from all stages of the destruction pipeline.

use std::io;
use thiserror::Error;

use crate::types::FailureKind;

/// Global error type for obliterate operations
#[derive(Error, Debug)]
pub enum ObliterateError {
    /// Input path missing, unreadable or otherwise unusable
    #[error("Input error: {0}")]
    Input(String),

    /// Target vanished or could not be classified
    #[error("Classification error: {0}")]
    Classification(String),

    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Rename or removal failed after the overwrite finished
    #[error("Unlink error: {0}")]
    Unlink(String),

    /// Per-entry error while expanding a directory
    #[error("Traversal error: {0}")]
    Traversal(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ObliterateError {
    /// Stage of the failure taxonomy this error belongs to
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ObliterateError::Input(_) => FailureKind::Input,
            ObliterateError::Classification(_) => FailureKind::Classification,
            ObliterateError::Unlink(_) => FailureKind::Unlink,
            ObliterateError::Traversal(_) => FailureKind::Traversal,
            _ => FailureKind::Io,
        }
    }
}

/// Specialized Result type for obliterate operations
pub type Result<T> = std::result::Result<T, ObliterateError>;

/// Creates an ObliterateError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::ObliterateError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

// Allow converting ObliterateError to io::Error so tests returning
// io::Result can use ? on engine results
impl From<ObliterateError> for io::Error {
    fn from(err: ObliterateError) -> Self {
        io::Error::new(io::ErrorKind::Other, err.to_string())
    }
}

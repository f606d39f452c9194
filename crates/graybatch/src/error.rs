//! Error types for graybatch.

use std::path::PathBuf;

use graybatch_gpu::GpuError;
use thiserror::Error;

/// Main error type for the graybatch library.
#[derive(Error, Debug)]
pub enum Error {
    /// The input directory could not be enumerated, or the output directory
    /// could not be created. Fatal to the whole run.
    #[error("cannot access directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode a source image.
    #[error("cannot open or read image file {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Failed to write an output image.
    #[error("failed to save image to {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    /// Device allocation, transfer or compute failure.
    #[error(transparent)]
    Device(#[from] GpuError),

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl Error {
    /// Whether this error ends the whole batch rather than one file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Directory { .. })
    }
}

/// Result type alias for graybatch operations.
pub type Result<T> = std::result::Result<T, Error>;

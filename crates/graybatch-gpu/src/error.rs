//! Error types for device operations.

use thiserror::Error;

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, GpuError>;

/// Error types that can occur while driving a compute device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// Device not available or backend not compiled in.
    #[error("device not available: {0}")]
    DeviceNotAvailable(String),

    /// Device memory could not be acquired.
    #[error("out of device memory: {0}")]
    OutOfMemory(String),

    /// Invalid buffer size or dimensions.
    #[error("invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize {
        /// Expected buffer size
        expected: usize,
        /// Actual buffer size
        actual: usize,
    },

    /// Memory transfer failed (host ↔ device).
    #[error("memory transfer failed: {0}")]
    MemoryTransferFailed(String),

    /// The color reduction primitive returned a non-success status.
    #[error("kernel reported status {code}")]
    KernelFailed {
        /// Raw status code returned by the primitive.
        code: i32,
    },

    /// Unrecognized backend name.
    #[error("unknown backend '{0}', expected one of: host, cuda, wgpu")]
    UnknownBackend(String),
}

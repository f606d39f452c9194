//! Device layer for graybatch.
//!
//! This crate moves one image at a time through a compute device: it
//! acquires scoped device buffers, stages interleaved RGB bytes onto the
//! device, runs the RGB to single-channel reduction over a region and
//! stages the result back.
//!
//! # Features
//!
//! - **Scoped memory**: device buffers are released when dropped, on every exit path
//! - **Tagged failures**: raw kernel status codes become [`GpuError::KernelFailed`]
//! - **Multi-platform**: CPU fallback always, CUDA and WGPU through CubeCL
//!
//! # Feature Flags
//!
//! - `cuda`: Enable CUDA backend (NVIDIA GPUs)
//! - `wgpu`: Enable WGPU backend (Vulkan/Metal/DirectX12)
//!
//! # Examples
//!
//! ```rust
//! use graybatch_gpu::{download, rgb_to_gray_execute, upload, GpuAllocator, HostRuntime, Region};
//!
//! let runtime = HostRuntime::new();
//! let region = Region::new(2, 1);
//!
//! let mut pair = GpuAllocator::new(&runtime).acquire(6, 2)?;
//! upload(&[255, 0, 0, 0, 0, 255], &mut pair.input)?;
//! rgb_to_gray_execute(&pair.input, &mut pair.output, region)?;
//!
//! let mut gray = [0u8; 2];
//! download(&pair.output, &mut gray)?;
//! assert_eq!(gray, [76, 29]);
//! # Ok::<(), graybatch_gpu::GpuError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod device;
pub mod error;
pub mod host;
pub mod memory;
pub mod ops;

#[cfg(feature = "gpu")]
pub mod runtime;

#[cfg(feature = "gpu")]
pub mod kernels;


// Re-exports
pub use allocator::{DeviceBuffer, DeviceBufferPair, GpuAllocator};
pub use device::{Backend, KernelStatus, Region, Runtime};
pub use error::{GpuError, Result};
pub use host::{HostBuffer, HostRuntime};
pub use memory::{download, to_host, upload};
pub use ops::{grayscale, rgb_to_gray_execute};

#[cfg(feature = "gpu")]
pub use runtime::*;

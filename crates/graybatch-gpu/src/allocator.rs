//! Scoped device memory.
//!
//! `GpuAllocator` hands out [`DeviceBuffer`]s and [`DeviceBufferPair`]s that
//! borrow the runtime they were allocated from and return their memory to it
//! when dropped. Nothing here pools or reuses allocations: every acquire maps
//! to one `Runtime::alloc`, and every buffer is freed exactly once.

use tracing::trace;

use crate::device::Runtime;
use crate::error::{GpuError, Result};

/// Device memory allocator handle.
///
/// A lightweight reference to a runtime used for memory operations.
///
/// # Examples
///
/// ```rust
/// use graybatch_gpu::{GpuAllocator, HostRuntime};
///
/// let runtime = HostRuntime::new();
/// let allocator = GpuAllocator::new(&runtime);
/// let pair = allocator.acquire(12, 4)?;
/// assert_eq!(runtime.live_allocations(), 2);
/// drop(pair);
/// assert_eq!(runtime.live_allocations(), 0);
/// # Ok::<(), graybatch_gpu::GpuError>(())
/// ```
#[derive(Debug)]
pub struct GpuAllocator<'r, R: Runtime> {
    runtime: &'r R,
}

impl<R: Runtime> Clone for GpuAllocator<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Runtime> Copy for GpuAllocator<'_, R> {}

impl<'r, R: Runtime> GpuAllocator<'r, R> {
    /// Create a new allocator for the specified runtime.
    pub fn new(runtime: &'r R) -> Self {
        Self { runtime }
    }

    /// Get the runtime this allocator draws from.
    pub fn runtime(&self) -> &'r R {
        self.runtime
    }

    /// Allocate a single buffer of `len` bytes.
    pub fn allocate(&self, len: usize) -> Result<DeviceBuffer<'r, R>> {
        if len == 0 {
            return Err(GpuError::OutOfMemory(
                "zero-sized device allocation requested".to_string(),
            ));
        }
        let raw = self.runtime.alloc(len)?;
        trace!(len, runtime = self.runtime.name(), "device buffer acquired");
        Ok(DeviceBuffer {
            runtime: self.runtime,
            raw: Some(raw),
            len,
        })
    }

    /// Acquire an input/output buffer pair for one image.
    ///
    /// If the output allocation fails the input allocation is released
    /// before the error is returned.
    pub fn acquire(&self, input_len: usize, output_len: usize) -> Result<DeviceBufferPair<'r, R>> {
        let input = self.allocate(input_len)?;
        let output = self.allocate(output_len)?;
        Ok(DeviceBufferPair { input, output })
    }
}

/// One device allocation, released when dropped.
pub struct DeviceBuffer<'r, R: Runtime> {
    runtime: &'r R,
    raw: Option<R::Buffer>,
    len: usize,
}

impl<'r, R: Runtime> DeviceBuffer<'r, R> {
    /// Size of the allocation in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the runtime owning this allocation.
    pub fn runtime(&self) -> &'r R {
        self.runtime
    }

    /// Get a reference to the backend handle.
    pub fn raw(&self) -> &R::Buffer {
        match &self.raw {
            Some(raw) => raw,
            None => unreachable!("device buffer used after release"),
        }
    }

    /// Get a mutable reference to the backend handle.
    pub fn raw_mut(&mut self) -> &mut R::Buffer {
        match &mut self.raw {
            Some(raw) => raw,
            None => unreachable!("device buffer used after release"),
        }
    }

    /// Release the allocation now instead of at end of scope.
    pub fn release(mut self) {
        self.free();
    }

    fn free(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.runtime.free(raw);
            trace!(len = self.len, runtime = self.runtime.name(), "device buffer released");
        }
    }
}

impl<R: Runtime> Drop for DeviceBuffer<'_, R> {
    fn drop(&mut self) {
        self.free();
    }
}

impl<R: Runtime> std::fmt::Debug for DeviceBuffer<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("runtime", &self.runtime.name())
            .field("len", &self.len)
            .field("live", &self.raw.is_some())
            .finish()
    }
}

/// Input and output allocations for one image.
#[derive(Debug)]
pub struct DeviceBufferPair<'r, R: Runtime> {
    /// Interleaved RGB input, `width * height * 3` bytes.
    pub input: DeviceBuffer<'r, R>,
    /// Single-channel output, `width * height` bytes.
    pub output: DeviceBuffer<'r, R>,
}

impl<R: Runtime> DeviceBufferPair<'_, R> {
    /// Release both allocations now.
    pub fn release(self) {
        let Self { input, output } = self;
        input.release();
        output.release();
    }
}

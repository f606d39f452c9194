//! CubeCL runtime wrapper for actual GPU execution.
//!
//! `RuntimeContext` implements the crate's [`Runtime`](crate::device::Runtime)
//! seam on top of a CubeCL compute client. Pixels are staged on the device
//! as `f32`, so device allocations are four times the byte size the
//! pipeline requests; conversion happens during upload and download.
//!
//! `alloc` only checks the size against the device limits. CubeCL memory is
//! claimed when the buffer is first written: upload creates the input
//! handle from host data and the kernel launch reserves the output handle.

use std::marker::PhantomData;

use cubecl::prelude::*;
use cubecl::server::Handle;
use tracing::debug;

use crate::device::{KernelStatus, Region, Runtime as DeviceRuntime};
use crate::error::{GpuError, Result};
use crate::kernels::color::rgb_to_gray_kernel;

// Re-export CubeCL's Runtime trait so downstream crates don't need cubecl directly
pub use cubecl::Runtime as CubeclRuntime;

const THREADS_PER_BLOCK: u32 = 256;

/// GPU runtime context with CubeCL Client.
pub struct RuntimeContext<R: Runtime> {
    client: ComputeClient<R::Server, R::Channel>,
    _phantom: PhantomData<R>,
}

impl<R: Runtime> RuntimeContext<R> {
    /// Create a new runtime context with the specified device.
    pub fn new(device: R::Device) -> Self {
        Self {
            client: R::client(&device),
            _phantom: PhantomData,
        }
    }

    /// Get a reference to the compute client.
    pub fn client(&self) -> &ComputeClient<R::Server, R::Channel> {
        &self.client
    }

    /// Get memory device properties (max page size, alignment).
    pub fn memory_properties(&self) -> (u64, u64) {
        let props = self.client.properties();
        let mem = props.memory_properties();
        (mem.max_page_size, mem.alignment)
    }
}

/// Device allocation owned by a [`RuntimeContext`].
pub struct CubeBuffer {
    handle: Option<Handle>,
    len: usize,
}

impl CubeBuffer {
    /// Number of pixel bytes the buffer stands for.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether device memory has been claimed yet.
    pub fn is_resident(&self) -> bool {
        self.handle.is_some()
    }

    fn staged_bytes(&self) -> usize {
        self.len * std::mem::size_of::<f32>()
    }
}

impl<R: Runtime> DeviceRuntime for RuntimeContext<R> {
    type Buffer = CubeBuffer;

    fn name(&self) -> &str {
        R::name()
    }

    fn alloc(&self, len: usize) -> Result<CubeBuffer> {
        let bytes = len
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or_else(|| GpuError::OutOfMemory(format!("{len} elements overflow")))?;
        let (max_page, _) = self.memory_properties();
        if bytes as u64 > max_page {
            return Err(GpuError::OutOfMemory(format!(
                "{bytes} bytes exceeds the device page size of {max_page}"
            )));
        }
        Ok(CubeBuffer { handle: None, len })
    }

    fn free(&self, buffer: CubeBuffer) {
        // CubeCL reclaims memory once the last handle is dropped
        drop(buffer);
    }

    fn copy_to_device(&self, src: &[u8], dst: &mut CubeBuffer) -> Result<()> {
        if src.len() != dst.len {
            return Err(GpuError::MemoryTransferFailed(format!(
                "host slice is {} bytes, device buffer is {}",
                src.len(),
                dst.len
            )));
        }
        let staged: Vec<f32> = src.iter().map(|&v| f32::from(v)).collect();
        dst.handle = Some(self.client.create(bytemuck::cast_slice(&staged)));
        Ok(())
    }

    fn copy_to_host(&self, src: &CubeBuffer, dst: &mut [u8]) -> Result<()> {
        if src.len != dst.len() {
            return Err(GpuError::MemoryTransferFailed(format!(
                "device buffer is {} bytes, host slice is {}",
                src.len,
                dst.len()
            )));
        }
        let Some(handle) = &src.handle else {
            return Err(GpuError::MemoryTransferFailed(
                "device buffer was never written".to_string(),
            ));
        };
        // client.read() blocks until every queued kernel touching the handle is done
        let bytes = self.client.read(handle.clone().binding());
        let values: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
        if values.len() < dst.len() {
            return Err(GpuError::MemoryTransferFailed(format!(
                "device returned {} values, expected {}",
                values.len(),
                dst.len()
            )));
        }
        for (out, v) in dst.iter_mut().zip(values) {
            *out = v.round().clamp(0.0, 255.0) as u8;
        }
        Ok(())
    }

    fn rgb_to_gray(
        &self,
        src: &CubeBuffer,
        src_step: usize,
        dst: &mut CubeBuffer,
        dst_step: usize,
        region: Region,
    ) -> KernelStatus {
        let num_pixels = region.pixels();
        if num_pixels == 0 || src.len < num_pixels * 3 || dst.len < num_pixels {
            return KernelStatus::SIZE_ERROR;
        }
        if src_step < region.rgb_step() || dst_step < region.gray_step() {
            return KernelStatus::STEP_ERROR;
        }
        let Ok(pixels) = u32::try_from(num_pixels) else {
            return KernelStatus::SIZE_ERROR;
        };
        let Some(src_handle) = &src.handle else {
            return KernelStatus::NULL_POINTER_ERROR;
        };
        let dst_bytes = dst.staged_bytes();
        let dst_handle = dst
            .handle
            .get_or_insert_with(|| self.client.empty(dst_bytes));

        let num_blocks = pixels.div_ceil(THREADS_PER_BLOCK);
        let cube_count = CubeCount::Static(num_blocks, 1, 1);
        let cube_dim = CubeDim::new(THREADS_PER_BLOCK, 1, 1);

        debug!(%region, num_blocks, backend = R::name(), "launching rgb_to_gray_kernel");

        unsafe {
            rgb_to_gray_kernel::launch_unchecked::<f32, R>(
                &self.client,
                cube_count,
                cube_dim,
                ArrayArg::from_raw_parts(src_handle, src.len, 1),
                ArrayArg::from_raw_parts(dst_handle, dst.len, 1),
                ScalarArg::new(region.width as u32),
                ScalarArg::new(src_step as u32),
                ScalarArg::new(dst_step as u32),
                ScalarArg::new(pixels),
            );
        }

        KernelStatus::SUCCESS
    }
}

/// Initialize a CUDA runtime with the first device.
///
/// # Errors
///
/// Returns an error if the runtime cannot be initialized (e.g., no GPU found).
#[cfg(feature = "cuda")]
pub fn init_cuda_runtime() -> Result<RuntimeContext<cubecl_cuda::CudaRuntime>> {
    use cubecl_cuda::CudaDevice;

    let device = CudaDevice::new(0);
    Ok(RuntimeContext::new(device))
}

/// Initialize a WGPU runtime with the best available adapter.
#[cfg(feature = "wgpu")]
pub fn init_wgpu_runtime() -> Result<RuntimeContext<cubecl_wgpu::WgpuRuntime>> {
    use cubecl_wgpu::WgpuDevice;

    let device = WgpuDevice::BestAvailable;
    Ok(RuntimeContext::new(device))
}

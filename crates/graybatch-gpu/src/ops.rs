//! Executable color reduction.
//!
//! This module wraps the backend primitive with size validation and turns
//! raw kernel status codes into [`GpuError`] values.

use tracing::debug;

use crate::allocator::{DeviceBuffer, GpuAllocator};
use crate::device::{KernelStatus, Region, Runtime};
use crate::error::{GpuError, Result};
use crate::memory::{download, upload};

/// Execute RGB to grayscale conversion on the device.
///
/// Input rows are `region.width * 3` bytes, output rows `region.width`
/// bytes, with no padding.
///
/// # Arguments
///
/// * `rgb` - Input RGB buffer (`width * height * 3` bytes)
/// * `gray` - Output grayscale buffer (`width * height` bytes)
/// * `region` - Extent to process; must match both buffers
///
/// # Errors
///
/// Returns [`GpuError::KernelFailed`] carrying the primitive's status code.
/// A region that does not match the buffers fails with
/// [`KernelStatus::SIZE_ERROR`] without reaching the device.
pub fn rgb_to_gray_execute<R: Runtime>(
    rgb: &DeviceBuffer<'_, R>,
    gray: &mut DeviceBuffer<'_, R>,
    region: Region,
) -> Result<()> {
    let num_pixels = region.pixels();
    if num_pixels == 0 || rgb.len() != num_pixels * 3 || gray.len() != num_pixels {
        debug!(
            %region,
            rgb_len = rgb.len(),
            gray_len = gray.len(),
            "region does not match device buffers"
        );
        return KernelStatus::SIZE_ERROR.into_result();
    }

    let runtime = rgb.runtime();
    runtime
        .rgb_to_gray(
            rgb.raw(),
            region.rgb_step(),
            gray.raw_mut(),
            region.gray_step(),
            region,
        )
        .into_result()
}

/// Run the full device round trip for one image.
///
/// Acquires an input/output pair, uploads `rgb`, reduces it, downloads the
/// result and releases the pair. The pair is released on every path,
/// including failures.
///
/// # Example
///
/// ```rust
/// use graybatch_gpu::{grayscale, HostRuntime, Region};
///
/// let runtime = HostRuntime::new();
/// let gray = grayscale(&runtime, &[255, 255, 255, 0, 0, 0], Region::new(2, 1))?;
/// assert_eq!(gray, vec![255, 0]);
/// assert_eq!(runtime.live_allocations(), 0);
/// # Ok::<(), graybatch_gpu::GpuError>(())
/// ```
pub fn grayscale<R: Runtime>(runtime: &R, rgb: &[u8], region: Region) -> Result<Vec<u8>> {
    let expected = region.pixels() * 3;
    if rgb.len() != expected {
        return Err(GpuError::InvalidBufferSize {
            expected,
            actual: rgb.len(),
        });
    }

    let mut pair = GpuAllocator::new(runtime).acquire(expected, region.pixels())?;
    upload(rgb, &mut pair.input)?;
    rgb_to_gray_execute(&pair.input, &mut pair.output, region)?;

    let mut gray = vec![0u8; region.pixels()];
    download(&pair.output, &mut gray)?;
    pair.release();

    Ok(gray)
}

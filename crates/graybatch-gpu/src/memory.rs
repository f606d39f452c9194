//! Memory transfer operations between host and device.
//!
//! Both directions are synchronous and move the full buffer.

use crate::allocator::DeviceBuffer;
use crate::device::Runtime;
use crate::error::{GpuError, Result};

/// Transfer host data into a device buffer.
///
/// # Arguments
///
/// * `data` - Host bytes, exactly as long as the buffer
/// * `buffer` - Destination device buffer
///
/// # Example
///
/// ```ignore
/// let mut input = allocator.allocate(rgb.len())?;
/// upload(&rgb, &mut input)?;
/// ```
pub fn upload<R: Runtime>(data: &[u8], buffer: &mut DeviceBuffer<'_, R>) -> Result<()> {
    if data.len() != buffer.len() {
        return Err(GpuError::MemoryTransferFailed(format!(
            "upload of {} bytes into a {} byte device buffer",
            data.len(),
            buffer.len()
        )));
    }
    let runtime = buffer.runtime();
    runtime.copy_to_device(data, buffer.raw_mut())
}

/// Transfer a device buffer back into host memory.
///
/// # Arguments
///
/// * `buffer` - Source device buffer
/// * `out` - Host destination, exactly as long as the buffer
pub fn download<R: Runtime>(buffer: &DeviceBuffer<'_, R>, out: &mut [u8]) -> Result<()> {
    if out.len() != buffer.len() {
        return Err(GpuError::MemoryTransferFailed(format!(
            "download of a {} byte device buffer into {} bytes",
            buffer.len(),
            out.len()
        )));
    }
    buffer.runtime().copy_to_host(buffer.raw(), out)
}

/// Transfer a device buffer into a freshly allocated host vector.
pub fn to_host<R: Runtime>(buffer: &DeviceBuffer<'_, R>) -> Result<Vec<u8>> {
    let mut out = vec![0u8; buffer.len()];
    download(buffer, &mut out)?;
    Ok(out)
}

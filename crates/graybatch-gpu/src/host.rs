//! CPU fallback runtime.
//!
//! Device memory is modeled as an arena of byte buffers owned by the runtime,
//! so transfers are real copies between host slices and arena storage, and
//! allocations are counted the way a device allocator would see them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::device::{KernelStatus, Region, Runtime};
use crate::error::{GpuError, Result};

// BT.601 luma weights in 16.16 fixed point, summing to 1 << 16.
const WEIGHT_R: u32 = 19_595;
const WEIGHT_G: u32 = 38_470;
const WEIGHT_B: u32 = 7_471;
const ROUND: u32 = 1 << 15;

/// Handle to an allocation in the host arena.
#[derive(Debug, PartialEq, Eq)]
pub struct HostBuffer {
    id: u64,
    len: usize,
}

impl HostBuffer {
    /// Size of the allocation in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the allocation is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Runtime executing the pipeline primitives on the CPU.
#[derive(Debug, Default)]
pub struct HostRuntime {
    arena: Mutex<HashMap<u64, Vec<u8>>>,
    next_id: AtomicU64,
    capacity: Option<usize>,
    bytes_in_use: AtomicUsize,
    total_allocations: AtomicUsize,
    total_frees: AtomicUsize,
}

impl HostRuntime {
    /// Create a host runtime without a memory limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host runtime that refuses allocations past `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Number of allocations currently held.
    pub fn live_allocations(&self) -> usize {
        self.arena().len()
    }

    /// Bytes currently allocated.
    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use.load(Ordering::SeqCst)
    }

    /// Successful allocations since creation.
    pub fn total_allocations(&self) -> usize {
        self.total_allocations.load(Ordering::SeqCst)
    }

    /// Frees since creation.
    pub fn total_frees(&self) -> usize {
        self.total_frees.load(Ordering::SeqCst)
    }

    fn arena(&self) -> MutexGuard<'_, HashMap<u64, Vec<u8>>> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Runtime for HostRuntime {
    type Buffer = HostBuffer;

    fn name(&self) -> &str {
        "host"
    }

    fn alloc(&self, len: usize) -> Result<HostBuffer> {
        let mut arena = self.arena();

        let in_use = self.bytes_in_use.load(Ordering::SeqCst);
        if let Some(capacity) = self.capacity {
            if in_use.saturating_add(len) > capacity {
                return Err(GpuError::OutOfMemory(format!(
                    "requested {len} bytes with {in_use} of {capacity} in use"
                )));
            }
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(len)
            .map_err(|e| GpuError::OutOfMemory(format!("requested {len} bytes: {e}")))?;
        storage.resize(len, 0);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        arena.insert(id, storage);
        self.bytes_in_use.fetch_add(len, Ordering::SeqCst);
        self.total_allocations.fetch_add(1, Ordering::SeqCst);

        Ok(HostBuffer { id, len })
    }

    fn free(&self, buffer: HostBuffer) {
        if let Some(storage) = self.arena().remove(&buffer.id) {
            self.bytes_in_use.fetch_sub(storage.len(), Ordering::SeqCst);
            self.total_frees.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn copy_to_device(&self, src: &[u8], dst: &mut HostBuffer) -> Result<()> {
        let mut arena = self.arena();
        let storage = arena.get_mut(&dst.id).ok_or_else(|| {
            GpuError::MemoryTransferFailed(format!("buffer {} is not allocated", dst.id))
        })?;
        if storage.len() != src.len() {
            return Err(GpuError::MemoryTransferFailed(format!(
                "host slice is {} bytes, device buffer is {}",
                src.len(),
                storage.len()
            )));
        }
        storage.copy_from_slice(src);
        Ok(())
    }

    fn copy_to_host(&self, src: &HostBuffer, dst: &mut [u8]) -> Result<()> {
        let arena = self.arena();
        let storage = arena.get(&src.id).ok_or_else(|| {
            GpuError::MemoryTransferFailed(format!("buffer {} is not allocated", src.id))
        })?;
        if storage.len() != dst.len() {
            return Err(GpuError::MemoryTransferFailed(format!(
                "device buffer is {} bytes, host slice is {}",
                storage.len(),
                dst.len()
            )));
        }
        dst.copy_from_slice(storage);
        Ok(())
    }

    fn rgb_to_gray(
        &self,
        src: &HostBuffer,
        src_step: usize,
        dst: &mut HostBuffer,
        dst_step: usize,
        region: Region,
    ) -> KernelStatus {
        if region.width == 0 || region.height == 0 {
            return KernelStatus::SIZE_ERROR;
        }
        if src_step < region.rgb_step() || dst_step < region.gray_step() {
            return KernelStatus::STEP_ERROR;
        }

        let mut arena = self.arena();
        // take the output out so input and output can be borrowed together
        let Some(mut gray) = arena.remove(&dst.id) else {
            return KernelStatus::NULL_POINTER_ERROR;
        };
        let status = match arena.get(&src.id) {
            Some(rgb) => reduce(rgb, src_step, &mut gray, dst_step, region),
            None => KernelStatus::NULL_POINTER_ERROR,
        };
        arena.insert(dst.id, gray);
        status
    }
}

fn reduce(rgb: &[u8], src_step: usize, gray: &mut [u8], dst_step: usize, region: Region) -> KernelStatus {
    let src_needed = (region.height - 1) * src_step + region.rgb_step();
    let dst_needed = (region.height - 1) * dst_step + region.gray_step();
    if rgb.len() < src_needed || gray.len() < dst_needed {
        return KernelStatus::SIZE_ERROR;
    }

    for y in 0..region.height {
        let src_row = &rgb[y * src_step..y * src_step + region.rgb_step()];
        let dst_row = &mut gray[y * dst_step..y * dst_step + region.gray_step()];
        for (px, out) in src_row.chunks_exact(3).zip(dst_row.iter_mut()) {
            *out = luma(px[0], px[1], px[2]);
        }
    }
    KernelStatus::SUCCESS
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = WEIGHT_R * u32::from(r) + WEIGHT_G * u32::from(g) + WEIGHT_B * u32::from(b) + ROUND;
    // max is 255 << 16 plus the rounding term, so the shift fits in u8
    (y >> 16) as u8
}

//! Device abstraction: the raw primitives every backend provides.

use std::fmt;
use std::str::FromStr;

use crate::error::{GpuError, Result};

/// Width/height of the rectangular pixel extent a transform covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
}

impl Region {
    /// Create a region descriptor.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered by the region.
    pub fn pixels(&self) -> usize {
        self.width * self.height
    }

    /// Row stride in bytes of an interleaved RGB buffer covering this region.
    pub fn rgb_step(&self) -> usize {
        self.width * 3
    }

    /// Row stride in bytes of a single-channel buffer covering this region.
    pub fn gray_step(&self) -> usize {
        self.width
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Raw status returned by the color reduction primitive.
///
/// Zero is success, negative values are errors. Codes only exist at the
/// [`Runtime`] seam; [`crate::ops::rgb_to_gray_execute`] turns them into
/// [`GpuError::KernelFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelStatus(pub i32);

impl KernelStatus {
    /// The primitive completed.
    pub const SUCCESS: Self = Self(0);
    /// The kernel could not be launched or failed while executing.
    pub const EXECUTION_ERROR: Self = Self(-3);
    /// Region and buffer sizes disagree.
    pub const SIZE_ERROR: Self = Self(-6);
    /// A buffer handle does not refer to live device memory.
    pub const NULL_POINTER_ERROR: Self = Self(-8);
    /// A row stride is smaller than the region row.
    pub const STEP_ERROR: Self = Self(-14);

    /// Whether the status reports success.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Convert the raw status into a tagged result.
    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(GpuError::KernelFailed { code: self.0 })
        }
    }
}

/// Trait representing a compute device backend.
///
/// Implementations expose device memory through an opaque `Buffer` type and
/// the synchronous primitives the pipeline is built from. Every call blocks
/// until the device has finished with it.
pub trait Runtime: Send + Sync + 'static {
    /// Handle to one device-resident allocation.
    type Buffer: Send;

    /// Get the name of the runtime.
    fn name(&self) -> &str;

    /// Allocate `len` bytes of device memory.
    fn alloc(&self, len: usize) -> Result<Self::Buffer>;

    /// Return an allocation to the device.
    fn free(&self, buffer: Self::Buffer);

    /// Copy `src` into the device buffer. Lengths must match.
    fn copy_to_device(&self, src: &[u8], dst: &mut Self::Buffer) -> Result<()>;

    /// Copy the device buffer into `dst`. Lengths must match.
    fn copy_to_host(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<()>;

    /// Reduce interleaved RGB to a single channel over `region`.
    ///
    /// `src_step` and `dst_step` are row strides in bytes.
    fn rgb_to_gray(
        &self,
        src: &Self::Buffer,
        src_step: usize,
        dst: &mut Self::Buffer,
        dst_step: usize,
        region: Region,
    ) -> KernelStatus;
}

/// Runtime backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// CPU fallback
    #[default]
    Host,
    /// CUDA backend (NVIDIA GPUs)
    Cuda,
    /// WGPU backend (Vulkan/Metal/DirectX12)
    Wgpu,
}

impl Backend {
    /// Check if the backend was compiled into this build.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Host => true,
            Backend::Cuda => cfg!(feature = "cuda"),
            Backend::Wgpu => cfg!(feature = "wgpu"),
        }
    }

    /// Fail with [`GpuError::DeviceNotAvailable`] unless the backend was
    /// compiled in.
    pub fn ensure_available(self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(GpuError::DeviceNotAvailable(format!(
                "backend '{self}' is not compiled in; rebuild with --features {self}"
            )))
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Host => "host",
            Backend::Cuda => "cuda",
            Backend::Wgpu => "wgpu",
        };
        f.write_str(name)
    }
}

impl FromStr for Backend {
    type Err = GpuError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "host" | "cpu" => Ok(Backend::Host),
            "cuda" => Ok(Backend::Cuda),
            "wgpu" => Ok(Backend::Wgpu),
            _ => Err(GpuError::UnknownBackend(s.to_string())),
        }
    }
}

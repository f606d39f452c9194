//! # graybatch
//!
//! Batch-convert a directory of color images to grayscale on a compute device.
//!
//! Each candidate image is decoded on the host, staged into freshly acquired
//! device buffers, reduced to a single channel, copied back and encoded next
//! to its siblings as `<name>_grayscale<ext>`. A file that fails at any stage
//! is skipped and reported; the rest of the batch carries on.
//!
//! ## Example
//!
//! ```no_run
//! use graybatch::{BatchConfig, BatchOrchestrator};
//! use graybatch_gpu::HostRuntime;
//!
//! # fn main() -> graybatch::Result<()> {
//! let batch = BatchOrchestrator::new(BatchConfig::default(), HostRuntime::new())?;
//! let report = batch.run()?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod codec;
pub mod config;
pub mod error;
pub mod listing;
pub mod record;

pub use batch::{BatchOrchestrator, BatchReport, FileOutcome, FileState, FileStatus};
pub use config::BatchConfig;
pub use error::{Error, Result};
pub use record::{GrayImage, ImageRecord};

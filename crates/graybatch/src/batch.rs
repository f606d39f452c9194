//! Batch orchestration.
//!
//! Drives every candidate file through decode, the device round trip and
//! encode, one file at a time. A failure in any per-file stage skips that
//! file and the batch moves on; only directory failures end the run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use graybatch_gpu::{download, rgb_to_gray_execute, upload, GpuAllocator, Runtime};
use tracing::{debug, error, info};

use crate::codec::{self, Encoded};
use crate::config::BatchConfig;
use crate::error::{Error, Result};
use crate::listing;

/// Progress of one file through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileState {
    Pending,
    Decoded,
    Uploaded,
    Computed,
    Downloaded,
    Encoded,
    Done,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileState::Pending => "pending",
            FileState::Decoded => "decoded",
            FileState::Uploaded => "uploaded",
            FileState::Computed => "computed",
            FileState::Downloaded => "downloaded",
            FileState::Encoded => "encoded",
            FileState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal state of one file.
#[derive(Debug)]
pub enum FileStatus {
    /// Output written.
    Done {
        /// Path actually written.
        output: PathBuf,
        /// PNG was substituted for an unrecognized extension.
        substituted: bool,
    },
    /// Processing abandoned.
    Skipped {
        /// Last state reached before the failure.
        stage: FileState,
        /// Why the file was skipped.
        error: Error,
    },
}

/// What happened to one candidate.
#[derive(Debug)]
pub struct FileOutcome {
    /// Input file the outcome belongs to.
    pub source: PathBuf,
    /// Terminal status.
    pub status: FileStatus,
}

impl FileOutcome {
    /// True when the output was written.
    pub fn is_done(&self) -> bool {
        matches!(self.status, FileStatus::Done { .. })
    }

    /// Written path, if the file was processed.
    pub fn output(&self) -> Option<&Path> {
        match &self.status {
            FileStatus::Done { output, .. } => Some(output),
            FileStatus::Skipped { .. } => None,
        }
    }

    /// Failure, if the file was skipped.
    pub fn error(&self) -> Option<&Error> {
        match &self.status {
            FileStatus::Done { .. } => None,
            FileStatus::Skipped { error, .. } => Some(error),
        }
    }
}

/// Outcome of a whole batch, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per candidate.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Number of candidates found.
    pub fn candidates(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of outputs written.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_done()).count()
    }

    /// Number of candidates abandoned.
    pub fn skipped(&self) -> usize {
        self.candidates() - self.succeeded()
    }

    /// True when no file was skipped.
    pub fn is_clean(&self) -> bool {
        self.skipped() == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batch processing complete: {} found, {} saved, {} skipped",
            self.candidates(),
            self.succeeded(),
            self.skipped()
        )
    }
}

/// Runs a batch against one device runtime.
pub struct BatchOrchestrator<R: Runtime> {
    config: BatchConfig,
    runtime: R,
}

impl<R: Runtime> BatchOrchestrator<R> {
    /// Create an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: BatchConfig, runtime: R) -> Result<Self> {
        config.validate()?;
        info!(
            "Batch configured: {} -> {} on {}",
            config.input_dir.display(),
            config.output_dir.display(),
            runtime.name()
        );
        Ok(Self { config, runtime })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Process every candidate in the input directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] if the input directory cannot be listed
    /// or the output directory cannot be created. Per-file failures are
    /// recorded in the report instead.
    pub fn run(&self) -> Result<BatchReport> {
        let candidates = listing::list_candidates(&self.config.input_dir)?;

        if candidates.is_empty() {
            info!(
                "No .png, .jpg, or .jpeg files found in {}",
                self.config.input_dir.display()
            );
            return Ok(BatchReport::default());
        }

        info!("Found {} images to process.", candidates.len());

        fs::create_dir_all(&self.config.output_dir).map_err(|source| Error::Directory {
            path: self.config.output_dir.clone(),
            source,
        })?;

        let outcomes = candidates
            .iter()
            .map(|source| self.process_file(source))
            .collect();
        let report = BatchReport { outcomes };

        info!("{report}");
        Ok(report)
    }

    /// Drive one file to a terminal state. Never fails the batch.
    pub fn process_file(&self, source: &Path) -> FileOutcome {
        info!("Processing: {}", source.display());

        let mut state = FileState::Pending;
        let status = match self.drive(source, &mut state) {
            Ok(encoded) => {
                advance(&mut state, FileState::Done, source);
                info!("Saved to {}", encoded.path.display());
                FileStatus::Done {
                    output: encoded.path,
                    substituted: encoded.substituted,
                }
            }
            Err(err) => {
                error!(
                    stage = %state,
                    "An error occurred while processing {}: {err}",
                    source.display()
                );
                FileStatus::Skipped { stage: state, error: err }
            }
        };

        FileOutcome {
            source: source.to_path_buf(),
            status,
        }
    }

    fn drive(&self, source: &Path, state: &mut FileState) -> Result<Encoded> {
        let record = codec::decode(source)?;
        advance(state, FileState::Decoded, source);

        let region = record.region();
        // released on every early return below when `pair` drops
        let mut pair =
            GpuAllocator::new(&self.runtime).acquire(record.pixels().len(), region.pixels())?;

        upload(record.pixels(), &mut pair.input)?;
        advance(state, FileState::Uploaded, source);

        rgb_to_gray_execute(&pair.input, &mut pair.output, region)?;
        advance(state, FileState::Computed, source);

        let mut gray = vec![0u8; region.pixels()];
        download(&pair.output, &mut gray)?;
        pair.release();
        advance(state, FileState::Downloaded, source);

        let gray = record.into_gray(gray)?;
        let encoded = codec::save_gray(&gray, &self.config.output_dir)?;
        advance(state, FileState::Encoded, source);

        Ok(encoded)
    }
}

fn advance(state: &mut FileState, next: FileState, source: &Path) {
    debug!(from = %state, to = %next, "{}", source.display());
    *state = next;
}

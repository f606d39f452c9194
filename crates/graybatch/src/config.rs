//! Batch configuration.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default directory scanned for input images.
pub const DEFAULT_INPUT_DIR: &str = "input_images";

/// Default directory receiving grayscale outputs.
pub const DEFAULT_OUTPUT_DIR: &str = "output_images";

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Directory scanned for candidate images.
    pub input_dir: PathBuf,

    /// Directory outputs are written to. Created if missing.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl BatchConfig {
    /// Create a configuration for the given directories.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.input_dir.as_os_str().is_empty() {
            return Err(Error::InvalidParameter {
                name: "input_dir".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::InvalidParameter {
                name: "output_dir".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

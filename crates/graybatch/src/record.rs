//! In-memory images and the naming metadata derived from their source path.

use std::path::{Path, PathBuf};

use graybatch_gpu::Region;

use crate::error::{Error, Result};

/// Channels in every decoded record.
pub const RGB_CHANNELS: usize = 3;

/// Suffix inserted between the base name and the extension of outputs.
pub const OUTPUT_SUFFIX: &str = "_grayscale";

/// One decoded image: interleaved RGB, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    base_name: String,
    extension: String,
}

impl ImageRecord {
    /// Build a record from decoded RGB pixels and the path they came from.
    ///
    /// # Errors
    ///
    /// Fails if either dimension is zero or `pixels` is not exactly
    /// `width * height * 3` bytes.
    pub fn new(source: &Path, width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Decode {
                path: source.to_path_buf(),
                reason: format!("image has zero-sized dimensions {width}x{height}"),
            });
        }
        let expected = width * height * RGB_CHANNELS;
        if pixels.len() != expected {
            return Err(Error::Decode {
                path: source.to_path_buf(),
                reason: format!("expected {expected} RGB bytes, got {}", pixels.len()),
            });
        }

        let (base_name, extension) = split_file_name(source);
        Ok(Self {
            width,
            height,
            pixels,
            base_name,
            extension,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Always 3.
    pub fn channel_count(&self) -> usize {
        RGB_CHANNELS
    }

    /// Interleaved RGB bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// File name without its last extension segment.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Last extension segment including the dot, or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Region descriptor covering the whole image.
    pub fn region(&self) -> Region {
        Region::new(self.width, self.height)
    }

    /// Where the grayscale version of this image goes inside `output_dir`.
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_path(output_dir, &self.base_name, &self.extension)
    }

    /// Replace the RGB pixels with a single-channel buffer.
    ///
    /// # Errors
    ///
    /// Fails if `gray` is not exactly `width * height` bytes.
    pub fn into_gray(self, gray: Vec<u8>) -> Result<GrayImage> {
        let expected = self.width * self.height;
        if gray.len() != expected {
            return Err(graybatch_gpu::GpuError::InvalidBufferSize {
                expected,
                actual: gray.len(),
            }
            .into());
        }
        Ok(GrayImage {
            width: self.width,
            height: self.height,
            pixels: gray,
            base_name: self.base_name,
            extension: self.extension,
        })
    }
}

/// Single-channel result of the device round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    base_name: String,
    extension: String,
}

impl GrayImage {
    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// One luma byte per pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Output location inside `output_dir`.
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_path(output_dir, &self.base_name, &self.extension)
    }
}

/// Split a path's file name into base name and extension (with its dot).
///
/// Only the last `.` counts: `archive.tar.gz` splits into `archive.tar` and
/// `.gz`. A name without a dot has an empty extension.
pub fn split_file_name(path: &Path) -> (String, String) {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match file_name.rfind('.') {
        Some(dot) => (file_name[..dot].to_string(), file_name[dot..].to_string()),
        None => (file_name, String::new()),
    }
}

/// `<output_dir>/<base_name>_grayscale<extension>`.
pub fn output_path(output_dir: &Path, base_name: &str, extension: &str) -> PathBuf {
    output_dir.join(format!("{base_name}{OUTPUT_SUFFIX}{extension}"))
}

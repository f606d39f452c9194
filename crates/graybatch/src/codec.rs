//! Image decoding and encoding.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader};

use crate::error::{Error, Result};
use crate::record::{GrayImage, ImageRecord};

/// JPEG quality used for every JPEG output.
pub const JPEG_QUALITY: u8 = 95;

/// Container formats the encoder writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Bmp,
}

impl OutputFormat {
    /// Map an extension (with its dot) to a format. Matching is exact.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            ".png" => Some(OutputFormat::Png),
            ".jpg" | ".jpeg" => Some(OutputFormat::Jpeg),
            ".bmp" => Some(OutputFormat::Bmp),
            _ => None,
        }
    }
}

/// Result of a successful encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Path of the file actually written.
    pub path: PathBuf,
    /// Format written.
    pub format: OutputFormat,
    /// Whether PNG was substituted for an unrecognized extension.
    pub substituted: bool,
}

/// Load an image and normalize it to interleaved RGB.
///
/// The container is detected from the file contents, not the extension.
///
/// # Errors
///
/// Returns [`Error::Decode`] with the decoder's reason if the file cannot be
/// read or parsed.
pub fn decode(path: &Path) -> Result<ImageRecord> {
    let decode_err = |reason: String| Error::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let img = ImageReader::open(path)
        .map_err(|e| decode_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    let rgb = img.into_rgb8();
    let (width, height) = rgb.dimensions();
    ImageRecord::new(path, width as usize, height as usize, rgb.into_raw())
}

/// Write a grayscale image, choosing the container from the path extension.
///
/// An unrecognized or missing extension is written as PNG under the same
/// name with a `.png` extension; the returned [`Encoded`] carries the real
/// path.
///
/// The image is encoded in memory first, so a failed encode never touches
/// an existing file at the target path and never leaves a partial one.
///
/// # Errors
///
/// Returns [`Error::Encode`] if the pixel buffer does not match the
/// dimensions or the file cannot be written.
pub fn encode(path: &Path, width: usize, height: usize, gray: &[u8]) -> Result<Encoded> {
    let encode_err = |path: &Path, reason: String| Error::Encode {
        path: path.to_path_buf(),
        reason,
    };

    if gray.len() != width * height {
        return Err(encode_err(
            path,
            format!("expected {} grayscale bytes, got {}", width * height, gray.len()),
        ));
    }
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(encode_err(path, format!("dimensions {width}x{height} exceed u32")));
    };

    let extension = crate::record::split_file_name(path).1;
    let (target, format, substituted) = match OutputFormat::from_extension(&extension) {
        Some(format) => (path.to_path_buf(), format, false),
        None => {
            let target = replace_extension(path, ".png");
            tracing::warn!(
                "unsupported output format '{extension}', saving {} as .png instead",
                path.display()
            );
            (target, OutputFormat::Png, true)
        }
    };

    let mut bytes = Vec::new();
    let written = match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(gray, w, h, ExtendedColorType::L8)
        }
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
            .write_image(gray, w, h, ExtendedColorType::L8),
        OutputFormat::Bmp => {
            BmpEncoder::new(&mut bytes).write_image(gray, w, h, ExtendedColorType::L8)
        }
    };
    written.map_err(|e| encode_err(&target, e.to_string()))?;

    write_file(&target, &bytes).map_err(|e| encode_err(&target, e.to_string()))?;

    Ok(Encoded {
        path: target,
        format,
        substituted,
    })
}

/// Encode a [`GrayImage`] to its output path inside `output_dir`.
pub fn save_gray(image: &GrayImage, output_dir: &Path) -> Result<Encoded> {
    encode(
        &image.output_path(output_dir),
        image.width(),
        image.height(),
        image.pixels(),
    )
}

fn write_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    if written.is_err() {
        // drop whatever part of the file made it to disk
        let _ = fs::remove_file(path);
    }
    written
}

fn replace_extension(path: &Path, extension: &str) -> PathBuf {
    let (base, _) = crate::record::split_file_name(path);
    path.with_file_name(format!("{base}{extension}"))
}

//! Color conversion GPU kernels.

#![allow(missing_docs)]

use cubecl::prelude::*;

/// RGB to Grayscale GPU kernel over a strided region.
///
/// Y = 0.299 * R + 0.587 * G + 0.114 * B
///
/// # Arguments
///
/// * `rgb` - Input RGB buffer, rows `rgb_step` elements apart
/// * `gray` - Output grayscale buffer, rows `gray_step` elements apart
/// * `width` - Region width in pixels
/// * `pixels` - Region width times height
///
/// # Thread Model
///
/// - Each thread processes one pixel of the region
/// - Thread reads 3 consecutive RGB values
/// - Thread writes 1 grayscale value
#[cube(launch_unchecked)]
pub fn rgb_to_gray_kernel<F: Float>(
    rgb: &Array<F>,
    gray: &mut Array<F>,
    width: u32,
    rgb_step: u32,
    gray_step: u32,
    pixels: u32,
) {
    let pos = ABSOLUTE_POS;

    if pos < pixels {
        let y = pos / width;
        let x = pos % width;
        let src = y * rgb_step + x * 3u32;

        let r = rgb[src];
        let g = rgb[src + 1u32];
        let b = rgb[src + 2u32];

        // ITU-R BT.601 luma coefficients
        gray[y * gray_step + x] = F::new(0.299) * r + F::new(0.587) * g + F::new(0.114) * b;
    }
}

//! # Floyd–Steinberg Error Diffusion
//!
//! This module converts a grayscale [`PixelBuffer`] into a binary
//! (ink / no ink) [`BitGrid`] suitable for a thermal print head.
//!
//! ## What is Dithering?
//!
//! A thermal printer can only burn a dot or leave the paper white. Dithering
//! simulates gray by varying the density of burned dots:
//!
//! ```text
//! Grayscale:    White    Light    Medium    Dark    Black
//!               ░░░░░░   ░░▒░░░   ░▒░▒░▒   ▒▓▒▓▒▓   ██████
//! ```
//!
//! ## Error Diffusion
//!
//! Pixels are visited in row-major order. Each pixel's current value `p`
//! (original gray plus error pushed onto it by earlier pixels) is quantized:
//!
//! - `p < threshold` → ink, quantized value 0
//! - otherwise → paper, quantized value 255
//!
//! The quantization error `e = p - quantized` is pushed onto the neighbors
//! that have not been visited yet:
//!
//! ```text
//!              ┌───────┬───────┐
//!              │   *   │ 7/16  │
//!      ┌───────┼───────┼───────┤
//!      │ 3/16  │ 5/16  │ 1/16  │
//!      └───────┴───────┴───────┘
//! ```
//!
//! Each neighbor is clamped to `[0, 255]` after receiving its share.
//! Contributions falling outside the buffer are dropped (no wraparound).
//! The working grid stores whole gray levels: after each share is added the
//! value is rounded to the nearest integer, ties to even, the way an 8-bit
//! clamped canvas buffer stores it. The rounding is done in sixteenths with
//! integer arithmetic, so the output is bit-for-bit reproducible on every
//! platform.
//!
//! ## Threshold Mode
//!
//! [`DitherAlgorithm::Threshold`] skips error diffusion entirely: ink wherever
//! `pixel < threshold`. Useful for line art and text-only labels where
//! diffusion noise around glyph edges is unwanted.
//!
//! ## Usage Example
//!
//! ```
//! use printy::render::{PixelBuffer, dither};
//!
//! let buffer = PixelBuffer::new(8, 1, vec![0, 0, 0, 0, 255, 255, 255, 255])?;
//! let grid = dither::dither(&buffer, dither::DEFAULT_THRESHOLD)?;
//! assert_eq!(grid.row(0), &[true, true, true, true, false, false, false, false]);
//! # Ok::<(), printy::PrintyError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::buffer::{BitGrid, PixelBuffer};
use crate::error::PrintyError;

/// Default quantization threshold (mid-gray).
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Neighbor offsets and weights (numerator over 16).
const DIFFUSION: [(i64, i64, i32); 4] = [(1, 0, 7), (-1, 1, 3), (0, 1, 5), (1, 1, 1)];

/// Rasterization algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitherAlgorithm {
    /// Floyd–Steinberg error diffusion
    #[default]
    FloydSteinberg,
    /// Plain threshold, no diffusion
    Threshold,
}

impl FromStr for DitherAlgorithm {
    type Err = PrintyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "floyd-steinberg" | "floyd_steinberg" | "fs" => Ok(Self::FloydSteinberg),
            "threshold" | "none" => Ok(Self::Threshold),
            other => Err(PrintyError::Config(format!(
                "Unknown dither algorithm '{}'. Use 'floyd-steinberg' or 'threshold'",
                other
            ))),
        }
    }
}

impl fmt::Display for DitherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FloydSteinberg => write!(f, "floyd-steinberg"),
            Self::Threshold => write!(f, "threshold"),
        }
    }
}

/// Rasterize `buffer` with the chosen algorithm.
pub fn rasterize(
    buffer: &PixelBuffer,
    algorithm: DitherAlgorithm,
    threshold: u8,
) -> Result<BitGrid, PrintyError> {
    match algorithm {
        DitherAlgorithm::FloydSteinberg => dither(buffer, threshold),
        DitherAlgorithm::Threshold => threshold_only(buffer, threshold),
    }
}

/// Floyd–Steinberg dither `buffer` into a bit grid.
///
/// ## Errors
///
/// `InvalidDimensions` if the buffer is empty or its pixel count does not
/// match `width * height`.
pub fn dither(buffer: &PixelBuffer, threshold: u8) -> Result<BitGrid, PrintyError> {
    let (width, height) = (buffer.width(), buffer.height());
    let (w, h) = (width as i64, height as i64);

    // Working copy; diffused values never leave [0, 255].
    let mut work: Vec<i32> = buffer.pixels().iter().map(|&p| p as i32).collect();
    let mut dots = Vec::with_capacity(work.len());
    let threshold = threshold as i32;

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let p = work[idx];
            let ink = p < threshold;
            dots.push(ink);

            let error = p - if ink { 0 } else { 255 };
            if error == 0 {
                continue;
            }

            for &(dx, dy, weight) in &DIFFUSION {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || nx >= w || ny >= h {
                    continue;
                }
                let n = (ny * w + nx) as usize;
                work[n] = round_sixteenths(work[n] * 16 + error * weight).clamp(0, 255);
            }
        }
    }

    BitGrid::new(width, height, dots)
}

/// Round `sixteenths / 16` to the nearest integer, ties to even.
fn round_sixteenths(sixteenths: i32) -> i32 {
    let whole = sixteenths.div_euclid(16);
    match sixteenths.rem_euclid(16) {
        0..=7 => whole,
        8 if whole.rem_euclid(2) == 0 => whole,
        _ => whole + 1,
    }
}

/// Threshold `buffer` without error diffusion.
pub fn threshold_only(buffer: &PixelBuffer, threshold: u8) -> Result<BitGrid, PrintyError> {
    let dots = buffer.pixels().iter().map(|&p| p < threshold).collect();
    BitGrid::new(buffer.width(), buffer.height(), dots)
}

// ============================================================================
// TESTS
// ============================================================================

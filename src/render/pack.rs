//! # Bit Packing
//!
//! Packs a dithered [`BitGrid`] into the byte rows a thermal printer's raster
//! mode expects.
//!
//! ## Bit Layout
//!
//! ```text
//! pixel x:   0   1   2   3   4   5   6   7 │ 8   9  ...
//! bit:       7   6   5   4   3   2   1   0 │ 7   6  ...
//!           └──────────── byte 0 ─────────┘└─ byte 1 ─
//! ```
//!
//! - Bit 7 (MSB) = leftmost pixel, bit 0 (LSB) = rightmost
//! - 1 = ink, 0 = paper
//! - Each row is `ceil(width / 8)` bytes; unused trailing bits are 0

use super::buffer::{BitGrid, Bitmap};
use crate::error::PrintyError;

/// Pack a row of boolean pixel values into bytes.
///
/// If the row length is not a multiple of 8, the last byte is padded with
/// zeros (paper) on the right.
///
/// ## Example
///
/// ```
/// use printy::render::pack::pack_row;
///
/// // 8 pixels pack into 1 byte
/// let row = vec![true, true, true, true, false, false, false, false];
/// assert_eq!(pack_row(&row), vec![0xF0]);
///
/// // 12 pixels pack into 2 bytes (4 bits padding)
/// let row = vec![true; 12];
/// assert_eq!(pack_row(&row), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; pixels.len().div_ceil(8)];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }

    bytes
}

/// Pack a whole grid into a [`Bitmap`].
///
/// The result always satisfies `bits.len() == height * ceil(width / 8)`.
pub fn pack(grid: &BitGrid) -> Result<Bitmap, PrintyError> {
    let row_bytes = Bitmap::row_bytes(grid.width());
    let mut bits = Vec::with_capacity(row_bytes * grid.height() as usize);

    for row in grid.rows() {
        bits.extend(pack_row(row));
    }

    Bitmap::new(grid.width(), grid.height(), bits)
}

// ============================================================================
// TESTS
// ============================================================================

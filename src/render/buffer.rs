//! # Raster Buffers
//!
//! The three image shapes that flow through the pipeline:
//!
//! ```text
//! PixelBuffer (u8 gray/px) ──dither──► BitGrid (bool/px) ──pack──► Bitmap (1 bit/px)
//! ```
//!
//! Each type validates its shape on construction, so downstream stages can
//! index without bounds surprises.

use crate::error::PrintyError;

/// Grayscale page as produced by the renderer.
///
/// One byte per pixel, row-major. 0 = black, 255 = white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a pixel buffer, checking `pixels.len() == width * height`.
    ///
    /// Zero-sized buffers are rejected: there is nothing to print.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, PrintyError> {
        check_dimensions(width, height, pixels.len())?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A buffer filled with a single gray level.
    pub fn filled(width: u32, height: u32, value: u8) -> Result<Self, PrintyError> {
        let len = (width as usize) * (height as usize);
        Self::new(width, height, vec![value; len])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

fn check_dimensions(width: u32, height: u32, len: usize) -> Result<(), PrintyError> {
    let expected = (width as usize).checked_mul(height as usize);
    if width == 0 || height == 0 || expected != Some(len) {
        return Err(PrintyError::InvalidDimensions { width, height, len });
    }
    Ok(())
}

/// Dithered page, one `bool` per pixel (`true` = ink).
///
/// This is the hand-off between dithering and bit packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitGrid {
    width: u32,
    height: u32,
    dots: Vec<bool>,
}

impl BitGrid {
    pub fn new(width: u32, height: u32, dots: Vec<bool>) -> Result<Self, PrintyError> {
        check_dimensions(width, height, dots.len())?;
        Ok(Self {
            width,
            height,
            dots,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row `y` as a slice of dots.
    pub fn row(&self, y: u32) -> &[bool] {
        let w = self.width as usize;
        let start = (y as usize) * w;
        &self.dots[start..start + w]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.dots.chunks(self.width as usize)
    }

    /// Number of inked dots.
    pub fn ink_count(&self) -> usize {
        self.dots.iter().filter(|&&d| d).count()
    }
}

/// # Packed Monochrome Raster
///
/// The format thermal printer firmware consumes directly:
///
/// - Row-major, `ceil(width / 8)` bytes per row
/// - Bit 7 (MSB) = leftmost pixel of each byte
/// - 1 = ink, 0 = paper; padding bits at the end of a row are 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl Bitmap {
    /// Wrap packed raster bytes, checking `bits.len() == height * ceil(width / 8)`.
    pub fn new(width: u32, height: u32, bits: Vec<u8>) -> Result<Self, PrintyError> {
        if width == 0 || height == 0 || bits.len() != Self::expected_len(width, height) {
            return Err(PrintyError::InvalidDimensions {
                width,
                height,
                len: bits.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Bytes per row for a raster of the given width.
    #[inline]
    pub fn row_bytes(width: u32) -> usize {
        (width as usize).div_ceil(8)
    }

    fn expected_len(width: u32, height: u32) -> usize {
        Self::row_bytes(width) * height as usize
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn into_bits(self) -> Vec<u8> {
        self.bits
    }

    /// Whether the dot at (x, y) is inked.
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        let byte_idx = (y as usize) * Self::row_bytes(self.width) + (x as usize) / 8;
        let bit_idx = 7 - (x % 8);
        (self.bits[byte_idx] >> bit_idx) & 1 == 1
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_buffer_valid() {
        let buf = PixelBuffer::new(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!((buf.width(), buf.height()), (3, 2));
        assert_eq!(buf.pixels(), &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_pixel_buffer_rejects_mismatch() {
        let err = PixelBuffer::new(4, 4, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            PrintyError::InvalidDimensions {
                width: 4,
                height: 4,
                len: 15
            }
        ));
    }

    #[test]
    fn test_pixel_buffer_rejects_zero_size() {
        assert!(PixelBuffer::new(0, 4, vec![]).is_err());
        assert!(PixelBuffer::new(4, 0, vec![]).is_err());
    }

    #[test]
    fn test_bitmap_length_law() {
        assert!(Bitmap::new(8, 2, vec![0; 2]).is_ok());
        assert!(Bitmap::new(9, 2, vec![0; 4]).is_ok());
        assert!(Bitmap::new(9, 2, vec![0; 3]).is_err());
    }

    #[test]
    fn test_bitmap_pixel_msb_first() {
        let bitmap = Bitmap::new(10, 1, vec![0b1000_0001, 0b0100_0000]).unwrap();
        assert!(bitmap.pixel(0, 0));
        assert!(!bitmap.pixel(1, 0));
        assert!(bitmap.pixel(7, 0));
        assert!(!bitmap.pixel(8, 0));
        assert!(bitmap.pixel(9, 0));
    }

    #[test]
    fn test_bit_grid_rows() {
        let grid = BitGrid::new(2, 2, vec![true, false, false, true]).unwrap();
        let rows: Vec<&[bool]> = grid.rows().collect();
        assert_eq!(rows, vec![&[true, false][..], &[false, true][..]]);
        assert_eq!(grid.row(1), &[false, true]);
        assert_eq!(grid.ink_count(), 2);
    }
}

//! # Rendering Module
//!
//! This module turns a rendered page into the packed raster a thermal label
//! printer consumes.
//!
//! ## Modules
//!
//! - [`buffer`]: `PixelBuffer`, `BitGrid` and `Bitmap` shapes
//! - [`dither`]: Floyd–Steinberg error diffusion (and plain threshold)
//! - [`pack`]: MSB-first bit packing into byte rows
//! - [`source`]: image files → `PixelBuffer`, `Bitmap` → PNG
//!
//! ## Usage Example
//!
//! ```
//! use printy::render::{self, PixelBuffer, dither::DitherAlgorithm};
//!
//! let page = PixelBuffer::filled(384, 40, 200)?;
//! let bitmap = render::rasterize(&page, DitherAlgorithm::FloydSteinberg, 128)?;
//!
//! assert_eq!(bitmap.bits().len(), 48 * 40); // 384 dots / 8 = 48 bytes per row
//! # Ok::<(), printy::PrintyError>(())
//! ```

pub mod buffer;
pub mod dither;
pub mod pack;
pub mod source;

pub use buffer::{BitGrid, Bitmap, PixelBuffer};
pub use source::ImageRenderer;

use crate::error::PrintyError;

/// Produces the grayscale page for a print job.
///
/// Rendering (templates, PDFs, photos) happens outside the print pipeline;
/// this is the boundary where its output comes in.
pub trait Renderer {
    fn render(&self) -> Result<PixelBuffer, PrintyError>;
}

/// An already-rendered page renders to itself.
impl Renderer for PixelBuffer {
    fn render(&self) -> Result<PixelBuffer, PrintyError> {
        Ok(self.clone())
    }
}

/// Dither and pack `buffer` in one step.
pub fn rasterize(
    buffer: &PixelBuffer,
    algorithm: dither::DitherAlgorithm,
    threshold: u8,
) -> Result<Bitmap, PrintyError> {
    let grid = dither::rasterize(buffer, algorithm, threshold)?;
    pack::pack(&grid)
}

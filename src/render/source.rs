//! # Image Ingestion and PNG Preview
//!
//! Turns an arbitrary image (PNG, JPEG, ...) into a [`PixelBuffer`] at the
//! printer's raster width, and writes a packed [`Bitmap`] back out as PNG so a
//! label can be inspected without wasting paper.
//!
//! ## Grayscale Conversion
//!
//! ```text
//! gray  = (299·R + 587·G + 114·B) / 1000
//! paper = gray·A/255 + 255·(255−A)/255     (transparent areas print white)
//! ```

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma, imageops::FilterType};
use tracing::debug;

use super::buffer::{Bitmap, PixelBuffer};
use super::Renderer;
use crate::error::PrintyError;

/// Renders an image into a grayscale buffer at a fixed raster width.
///
/// The image is scaled (up or down) so its width matches `width` exactly,
/// keeping its aspect ratio.
#[derive(Debug, Clone)]
pub struct ImageRenderer {
    source: ImageSource,
    width: u32,
}

#[derive(Debug, Clone)]
enum ImageSource {
    Path(PathBuf),
    Decoded(DynamicImage),
}

impl ImageRenderer {
    /// Render the image file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, width: u32) -> Self {
        Self {
            source: ImageSource::Path(path.as_ref().to_path_buf()),
            width,
        }
    }

    /// Render an already-decoded image.
    pub fn from_image(image: DynamicImage, width: u32) -> Self {
        Self {
            source: ImageSource::Decoded(image),
            width,
        }
    }

    fn load(&self) -> Result<DynamicImage, PrintyError> {
        match &self.source {
            ImageSource::Path(path) => image::open(path).map_err(|e| {
                PrintyError::Render(format!("Failed to decode {}: {}", path.display(), e))
            }),
            ImageSource::Decoded(img) => Ok(img.clone()),
        }
    }
}

impl Renderer for ImageRenderer {
    fn render(&self) -> Result<PixelBuffer, PrintyError> {
        if self.width == 0 {
            return Err(PrintyError::Render("Target width must be positive".into()));
        }

        let img = self.load()?;
        let (src_w, src_h) = (img.width(), img.height());
        if src_w == 0 || src_h == 0 {
            return Err(PrintyError::Render("Image has no pixels".into()));
        }

        let height = ((src_h as u64 * self.width as u64) / src_w as u64).max(1) as u32;
        let img = if src_w == self.width && src_h == height {
            img
        } else {
            img.resize_exact(self.width, height, FilterType::Triangle)
        };

        debug!(
            "Rendered {}x{} image to {}x{} raster",
            src_w, src_h, self.width, height
        );

        let pixels = img.to_rgba8().pixels().map(|p| flatten(p.0)).collect();
        PixelBuffer::new(self.width, height, pixels)
    }
}

/// Luma of an RGBA pixel composited onto white paper.
fn flatten([r, g, b, a]: [u8; 4]) -> u8 {
    let gray = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
    let a = a as u32;
    ((gray * a + 255 * (255 - a)) / 255) as u8
}

/// Convert a packed bitmap to a black-on-white grayscale image.
pub fn bitmap_to_image(bitmap: &Bitmap) -> GrayImage {
    GrayImage::from_fn(bitmap.width(), bitmap.height(), |x, y| {
        Luma([if bitmap.pixel(x, y) { 0u8 } else { 255u8 }])
    })
}

/// Save a packed bitmap as a PNG image.
pub fn save_png<P: AsRef<Path>>(path: P, bitmap: &Bitmap) -> Result<(), PrintyError> {
    bitmap_to_image(bitmap)
        .save(path.as_ref())
        .map_err(|e| PrintyError::Image(format!("Failed to save PNG: {}", e)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_flatten() {
        assert_eq!(flatten([255, 255, 255, 255]), 255);
        assert_eq!(flatten([0, 0, 0, 255]), 0);
        // Fully transparent black is paper
        assert_eq!(flatten([0, 0, 0, 0]), 255);
    }

    #[test]
    fn test_render_scales_to_width() {
        let img = RgbaImage::from_pixel(100, 50, Rgba([0, 0, 0, 255]));
        let renderer = ImageRenderer::from_image(DynamicImage::ImageRgba8(img), 384);
        let buffer = renderer.render().unwrap();
        assert_eq!(buffer.width(), 384);
        assert_eq!(buffer.height(), 192);
        assert!(buffer.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_render_keeps_exact_size() {
        let img = RgbaImage::from_fn(8, 2, |x, _| {
            if x < 4 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let renderer = ImageRenderer::from_image(DynamicImage::ImageRgba8(img), 8);
        let buffer = renderer.render().unwrap();
        let row = [0, 0, 0, 0, 255, 255, 255, 255];
        assert_eq!(buffer.pixels(), [row, row].concat());
    }

    #[test]
    fn test_render_missing_file() {
        let renderer = ImageRenderer::from_path("/nonexistent/label.png", 384);
        assert!(matches!(renderer.render(), Err(PrintyError::Render(_))));
    }

    #[test]
    fn test_bitmap_to_image() {
        let bitmap = Bitmap::new(9, 1, vec![0b1000_0000, 0b1000_0000]).unwrap();
        let img = bitmap_to_image(&bitmap);
        assert_eq!(img.dimensions(), (9, 1));
        assert_eq!(img.get_pixel(0, 0).0, [0]);
        assert_eq!(img.get_pixel(1, 0).0, [255]);
        assert_eq!(img.get_pixel(8, 0).0, [0]);
    }
}

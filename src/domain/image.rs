//! Normalized pixel container for detector input.
//!
//! Detectors consume an [`ImageBuffer`]: raw sample data plus format
//! metadata, validated at construction so downstream code never re-checks
//! dimensions. The canonical working format is 8-bit RGB; other formats are
//! converted on demand.

use crate::core::errors::{VisionError, VisionResult};
use image::RgbImage;

/// Pixel layout of an [`ImageBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGB, 3 bytes per pixel.
    Rgb8,
    /// 8-bit RGBA, 4 bytes per pixel.
    Rgba8,
    /// 8-bit BGRA, 4 bytes per pixel.
    Bgra8,
    /// 8-bit grayscale, 1 byte per pixel.
    Luma8,
}

impl PixelFormat {
    /// Returns the number of bytes one pixel occupies in this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Luma8 => 1,
        }
    }
}

/// An owned image with normalized format metadata.
///
/// Invariant: `data.len() == width * height * format.bytes_per_pixel()` and
/// both dimensions are non-zero. Constructors enforce this; a constructed
/// buffer is always internally consistent.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Creates a buffer from raw sample data.
    ///
    /// # Errors
    ///
    /// Returns `VisionError::InvalidInput` if either dimension is zero or the
    /// data length does not match `width * height * bytes_per_pixel`.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> VisionResult<Self> {
        if width == 0 || height == 0 {
            return Err(VisionError::invalid_input(format!(
                "image dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(VisionError::validation_error(
                "ImageBuffer",
                "data length",
                &expected.to_string(),
                &data.len().to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Wraps a decoded RGB image without copying.
    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Rgb8,
            data: image.into_raw(),
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the raw sample data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the total pixel count.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Converts the buffer to the canonical 8-bit RGB working format.
    ///
    /// `Rgb8` buffers copy their data through unchanged; other formats are
    /// converted channel-wise.
    pub fn to_rgb(&self) -> VisionResult<RgbImage> {
        let pixels = self.pixel_count();
        let rgb: Vec<u8> = match self.format {
            PixelFormat::Rgb8 => self.data.clone(),
            PixelFormat::Rgba8 => {
                let mut out = Vec::with_capacity(pixels * 3);
                for px in self.data.chunks_exact(4) {
                    out.extend_from_slice(&px[..3]);
                }
                out
            }
            PixelFormat::Bgra8 => {
                let mut out = Vec::with_capacity(pixels * 3);
                for px in self.data.chunks_exact(4) {
                    out.extend_from_slice(&[px[2], px[1], px[0]]);
                }
                out
            }
            PixelFormat::Luma8 => {
                let mut out = Vec::with_capacity(pixels * 3);
                for &l in &self.data {
                    out.extend_from_slice(&[l, l, l]);
                }
                out
            }
        };
        RgbImage::from_raw(self.width, self.height, rgb).ok_or_else(|| {
            VisionError::invalid_input("image buffer dimensions overflow the container")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(ImageBuffer::new(0, 4, PixelFormat::Rgb8, vec![]).is_err());
        assert!(ImageBuffer::new(4, 0, PixelFormat::Rgb8, vec![]).is_err());
    }

    #[test]
    fn test_rejects_mismatched_data_length() {
        let err = ImageBuffer::new(2, 2, PixelFormat::Rgb8, vec![0u8; 11]).unwrap_err();
        assert!(err.to_string().contains("data length"));
    }

    #[test]
    fn test_accepts_consistent_buffer() {
        let buf = ImageBuffer::new(2, 2, PixelFormat::Rgba8, vec![0u8; 16]).unwrap();
        assert_eq!(buf.pixel_count(), 4);
        assert_eq!(buf.format().bytes_per_pixel(), 4);
    }

    #[test]
    fn test_bgra_to_rgb_swaps_channels() {
        let buf = ImageBuffer::new(1, 1, PixelFormat::Bgra8, vec![10, 20, 30, 255]).unwrap();
        let rgb = buf.to_rgb().unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [30, 20, 10]);
    }

    #[test]
    fn test_luma_to_rgb_replicates() {
        let buf = ImageBuffer::new(2, 1, PixelFormat::Luma8, vec![7, 9]).unwrap();
        let rgb = buf.to_rgb().unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [7, 7, 7]);
        assert_eq!(rgb.get_pixel(1, 0).0, [9, 9, 9]);
    }

    #[test]
    fn test_from_rgb_round_trip() {
        let img = RgbImage::from_pixel(3, 2, image::Rgb([1, 2, 3]));
        let buf = ImageBuffer::from_rgb(img.clone());
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.to_rgb().unwrap(), img);
    }
}

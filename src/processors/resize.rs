//! Resizing helpers for model input preparation.

use crate::processors::geometry::BoundRect;
use image::{Rgb, RgbImage, imageops};

/// Records how an image was scaled and padded so detections can be mapped
/// back into source coordinates.
#[derive(Debug, Clone, Copy)]
pub struct ResizeInfo {
    /// Uniform scale factor applied to the source image.
    pub scale: f32,
    /// Source image dimensions (width, height).
    pub original: (u32, u32),
    /// Target canvas dimensions (width, height).
    pub target: (u32, u32),
}

impl ResizeInfo {
    /// Computes the letterbox scale for fitting `original` into `target`.
    pub fn fit(original: (u32, u32), target: (u32, u32)) -> Self {
        let sx = target.0 as f32 / original.0 as f32;
        let sy = target.1 as f32 / original.1 as f32;
        Self {
            scale: sx.min(sy),
            original,
            target,
        }
    }

    /// Maps a point from model-input coordinates back to source coordinates.
    pub fn map_back(&self, x: f32, y: f32) -> (f32, f32) {
        (x / self.scale, y / self.scale)
    }

    /// Maps a rectangle from model-input coordinates back to source
    /// coordinates, clamped to the source bounds.
    pub fn map_rect_back(&self, rect: &BoundRect) -> BoundRect {
        let (x1, y1) = self.map_back(rect.x1, rect.y1);
        let (x2, y2) = self.map_back(rect.x2, rect.y2);
        BoundRect::new(x1, y1, x2, y2).clamp(self.original.0 as f32, self.original.1 as f32)
    }
}

/// Resizes an image to fit into `target` preserving aspect ratio and pads
/// the remainder with black (top-left anchored).
pub fn letterbox(image: &RgbImage, target: (u32, u32)) -> (RgbImage, ResizeInfo) {
    let info = ResizeInfo::fit(image.dimensions(), target);
    let new_w = ((image.width() as f32 * info.scale).round() as u32).max(1);
    let new_h = ((image.height() as f32 * info.scale).round() as u32).max(1);

    let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(target.0, target.1, Rgb([0, 0, 0]));
    imageops::overlay(&mut canvas, &resized, 0, 0);
    (canvas, info)
}

/// Resizes an image to exactly `target`, ignoring aspect ratio.
pub fn resize_exact(image: &RgbImage, target: (u32, u32)) -> RgbImage {
    imageops::resize(image, target.0, target.1, imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_dimensions() {
        let img = RgbImage::new(100, 50);
        let (out, info) = letterbox(&img, (64, 64));
        assert_eq!(out.dimensions(), (64, 64));
        assert!((info.scale - 0.64).abs() < 1e-6);
    }

    #[test]
    fn test_map_back_inverts_scale() {
        let info = ResizeInfo::fit((100, 50), (64, 64));
        let (x, y) = info.map_back(64.0, 32.0);
        assert!((x - 100.0).abs() < 1e-4);
        assert!((y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_map_rect_back_clamps_to_source() {
        let info = ResizeInfo::fit((100, 50), (64, 64));
        let rect = BoundRect::new(-10.0, 0.0, 128.0, 32.0);
        let mapped = info.map_rect_back(&rect);
        assert_eq!(mapped.x1, 0.0);
        assert_eq!(mapped.x2, 100.0);
    }

    #[test]
    fn test_resize_exact_ignores_aspect() {
        let img = RgbImage::new(100, 50);
        assert_eq!(resize_exact(&img, (32, 32)).dimensions(), (32, 32));
    }
}

//! Detection overlay rendering for debugging output.
//!
//! Draws bounding regions and optional labels onto a copy of the source
//! image. A font is only required when labels are drawn; it is loaded from a
//! caller-supplied path.

use crate::core::errors::{VisionError, VisionResult};
use crate::processors::geometry::BoundRect;
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

const REGION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);

/// Configuration for overlay rendering.
#[derive(Debug)]
pub struct OverlayConfig {
    /// Font used for labels; labels are skipped when None.
    pub font: Option<FontVec>,
    /// Label text height in pixels.
    pub font_scale: f32,
    /// Region outline thickness in pixels.
    pub thickness: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 16.0,
            thickness: 2,
        }
    }
}

impl OverlayConfig {
    /// Creates a config with a font loaded from the specified path.
    pub fn with_font_path(font_path: &Path) -> VisionResult<Self> {
        let font_data = std::fs::read(font_path)?;
        let font = FontVec::try_from_vec(font_data).map_err(|_| {
            VisionError::invalid_input(format!(
                "failed to parse font file: {}",
                font_path.display()
            ))
        })?;
        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }
}

/// Draws regions (and labels, when a font is configured) onto a copy of the
/// image.
pub fn draw_regions(
    image: &RgbImage,
    regions: &[(BoundRect, Option<String>)],
    config: &OverlayConfig,
) -> RgbImage {
    let mut canvas = image.clone();
    let (width, height) = canvas.dimensions();

    for (region, label) in regions {
        let clamped = region.clamp(width as f32, height as f32);
        if clamped.width() < 1.0 || clamped.height() < 1.0 {
            continue;
        }
        for t in 0..config.thickness {
            let x = (clamped.x1 as i32 - t as i32).max(0);
            let y = (clamped.y1 as i32 - t as i32).max(0);
            let w = (clamped.width() as u32 + 2 * t).max(1);
            let h = (clamped.height() as u32 + 2 * t).max(1);
            draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(w, h), REGION_COLOR);
        }

        if let (Some(font), Some(text)) = (config.font.as_ref(), label.as_ref()) {
            let scale = PxScale::from(config.font_scale);
            let text_y = (clamped.y1 - config.font_scale).max(0.0) as i32;
            draw_text_mut(
                &mut canvas,
                TEXT_COLOR,
                clamped.x1 as i32,
                text_y,
                scale,
                font,
                text,
            );
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_regions_marks_outline() {
        let image = RgbImage::new(32, 32);
        let regions = vec![(BoundRect::new(4.0, 4.0, 12.0, 12.0), None)];
        let out = draw_regions(&image, &regions, &OverlayConfig::default());
        assert_eq!(out.get_pixel(4, 4).0, [255, 0, 0]);
        // interior untouched
        assert_eq!(out.get_pixel(8, 8).0, [0, 0, 0]);
    }

    #[test]
    fn test_draw_regions_skips_degenerate() {
        let image = RgbImage::new(8, 8);
        let regions = vec![(BoundRect::new(5.0, 5.0, 5.0, 5.0), None)];
        let out = draw_regions(&image, &regions, &OverlayConfig::default());
        assert_eq!(out, image);
    }
}

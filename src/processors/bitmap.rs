//! Segmentation-bitmap postprocessing.
//!
//! Converts a per-pixel probability map from a segmentation detection head
//! into scored bounding regions: threshold, optional dilation, contour
//! extraction, per-region score, and mapping back to source coordinates.

use crate::core::errors::{VisionError, VisionResult};
use crate::core::validation::{validate_positive, validate_range};
use crate::processors::geometry::BoundRect;
use crate::processors::resize::ResizeInfo;
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;
use itertools::Itertools;
use ndarray::ArrayView2;
use tracing::debug;

/// Configuration for [`BitmapPostProcess`].
#[derive(Debug, Clone)]
pub struct BitmapPostProcessConfig {
    /// Pixel-level threshold for binarizing the probability map.
    /// Default: 0.3
    pub score_threshold: f32,
    /// Region-level threshold; regions whose mean probability falls below
    /// this are discarded. Default: 0.6
    pub box_threshold: f32,
    /// Maximum number of regions returned. Default: 1000
    pub max_candidates: usize,
    /// Minimum side length (in map pixels) for a region. Default: 3.0
    pub min_size: f32,
    /// Whether to dilate the binary map before contour extraction,
    /// connecting nearby components. Default: false
    pub use_dilation: bool,
}

impl Default for BitmapPostProcessConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.3,
            box_threshold: 0.6,
            max_candidates: 1000,
            min_size: 3.0,
            use_dilation: false,
        }
    }
}

impl BitmapPostProcessConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> VisionResult<()> {
        validate_range(self.score_threshold, 0.0, 1.0, "score_threshold")?;
        validate_range(self.box_threshold, 0.0, 1.0, "box_threshold")?;
        validate_positive(self.max_candidates, "max_candidates")?;
        Ok(())
    }
}

/// Extracts scored regions from a segmentation probability map.
#[derive(Debug, Clone)]
pub struct BitmapPostProcess {
    config: BitmapPostProcessConfig,
}

impl BitmapPostProcess {
    /// Creates a postprocessor with the given configuration.
    pub fn new(config: BitmapPostProcessConfig) -> VisionResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Applies postprocessing to a `[H, W]` probability map.
    ///
    /// Returned regions are in source-image coordinates (mapped back through
    /// `resize`), ordered by descending score.
    pub fn apply(
        &self,
        prob_map: ArrayView2<'_, f32>,
        resize: &ResizeInfo,
    ) -> VisionResult<Vec<(BoundRect, f32)>> {
        let (height, width) = prob_map.dim();
        if height == 0 || width == 0 {
            return Err(VisionError::invalid_input(
                "probability map must be non-empty",
            ));
        }

        let mut binary = GrayImage::new(width as u32, height as u32);
        for ((y, x), &p) in prob_map.indexed_iter() {
            if p > self.config.score_threshold {
                binary.put_pixel(x as u32, y as u32, image::Luma([255u8]));
            }
        }
        if self.config.use_dilation {
            binary = dilate(&binary, Norm::LInf, 1);
        }

        let contours = find_contours::<i32>(&binary);
        debug!(
            contours = contours.len(),
            "extracted contours from probability map"
        );

        let mut regions: Vec<(BoundRect, f32)> = Vec::new();
        for contour in contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .take(self.config.max_candidates)
        {
            if contour.points.is_empty() {
                continue;
            }
            let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
            let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
            for p in &contour.points {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
            let rect = BoundRect::new(
                min_x as f32,
                min_y as f32,
                (max_x + 1) as f32,
                (max_y + 1) as f32,
            );
            if rect.min_side() < self.config.min_size {
                continue;
            }

            let score = region_score(&prob_map, min_x, min_y, max_x, max_y);
            if score < self.config.box_threshold {
                continue;
            }
            regions.push((resize.map_rect_back(&rect), score));
        }

        Ok(regions
            .into_iter()
            .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .collect())
    }
}

/// Mean probability over the pixels of a map region.
fn region_score(
    prob_map: &ArrayView2<'_, f32>,
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
) -> f32 {
    let (height, width) = prob_map.dim();
    let x0 = min_x.max(0) as usize;
    let y0 = min_y.max(0) as usize;
    let x1 = (max_x as usize).min(width - 1);
    let y1 = (max_y as usize).min(height - 1);

    let mut sum = 0.0f32;
    let mut count = 0usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            sum += prob_map[[y, x]];
            count += 1;
        }
    }
    if count == 0 { 0.0 } else { sum / count as f32 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn identity_resize(width: u32, height: u32) -> ResizeInfo {
        ResizeInfo::fit((width, height), (width, height))
    }

    #[test]
    fn test_empty_map_rejected() {
        let post = BitmapPostProcess::new(BitmapPostProcessConfig::default()).unwrap();
        let map = Array2::<f32>::zeros((0, 0));
        assert!(post.apply(map.view(), &identity_resize(1, 1)).is_err());
    }

    #[test]
    fn test_uniform_low_map_yields_no_regions() {
        let post = BitmapPostProcess::new(BitmapPostProcessConfig::default()).unwrap();
        let map = Array2::from_elem((32, 32), 0.1f32);
        let regions = post.apply(map.view(), &identity_resize(32, 32)).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_high_block_produces_one_region() {
        let post = BitmapPostProcess::new(BitmapPostProcessConfig::default()).unwrap();
        let mut map = Array2::from_elem((32, 32), 0.0f32);
        for y in 8..16 {
            for x in 8..24 {
                map[[y, x]] = 0.95;
            }
        }
        let regions = post.apply(map.view(), &identity_resize(32, 32)).unwrap();
        assert_eq!(regions.len(), 1);
        let (rect, score) = regions[0];
        assert!(score > 0.9);
        assert!(rect.x1 >= 7.0 && rect.x2 <= 25.0);
        assert!(rect.y1 >= 7.0 && rect.y2 <= 17.0);
    }

    #[test]
    fn test_small_regions_filtered_by_min_size() {
        let post = BitmapPostProcess::new(BitmapPostProcessConfig::default()).unwrap();
        let mut map = Array2::from_elem((32, 32), 0.0f32);
        map[[5, 5]] = 0.99;
        let regions = post.apply(map.view(), &identity_resize(32, 32)).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = BitmapPostProcessConfig {
            score_threshold: 1.5,
            ..Default::default()
        };
        assert!(BitmapPostProcess::new(config).is_err());
    }
}

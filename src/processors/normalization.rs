//! Image normalization for model input.
//!
//! Converts 8-bit RGB images into mean/std-normalized NCHW tensors. The
//! normalization is stored in fused `alpha`/`beta` form (`alpha = scale / std`,
//! `beta = -mean / std`) so the per-pixel work is one multiply-add.

use crate::core::errors::{VisionError, VisionResult};
use crate::core::inference::Tensor4D;
use image::RgbImage;
use rayon::prelude::*;

/// Normalizes RGB images into NCHW f32 tensors.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Scaling factors for each channel (alpha = scale / std)
    alpha: [f32; 3],
    /// Offset values for each channel (beta = -mean / std)
    beta: [f32; 3],
}

impl Normalizer {
    /// Creates a normalizer with the specified parameters.
    ///
    /// Defaults: `scale = 1/255`, ImageNet mean `[0.485, 0.456, 0.406]` and
    /// std `[0.229, 0.224, 0.225]`.
    ///
    /// # Errors
    ///
    /// Returns `VisionError::ConfigError` if scale or any std value is not
    /// strictly positive.
    pub fn new(
        scale: Option<f32>,
        mean: Option<[f32; 3]>,
        std: Option<[f32; 3]>,
    ) -> VisionResult<Self> {
        let scale = scale.unwrap_or(1.0 / 255.0);
        let mean = mean.unwrap_or([0.485, 0.456, 0.406]);
        let std = std.unwrap_or([0.229, 0.224, 0.225]);

        if scale <= 0.0 {
            return Err(VisionError::config_error("scale must be greater than 0"));
        }
        for (i, &s) in std.iter().enumerate() {
            if s <= 0.0 {
                return Err(VisionError::config_error(format!(
                    "standard deviation at index {i} must be greater than 0, got {s}"
                )));
            }
        }

        let mut alpha = [0.0f32; 3];
        let mut beta = [0.0f32; 3];
        for c in 0..3 {
            alpha[c] = scale / std[c];
            beta[c] = -mean[c] / std[c];
        }
        Ok(Self { alpha, beta })
    }

    /// Creates a normalizer mapping bytes to `[-1, 1]` (scale 1/128, mean 0.5*255-ish
    /// folded as mean 127.5/255, std 0.5), the convention of SCRFD-family models.
    pub fn symmetric() -> Self {
        // (x/255 - 0.5) / 0.5 == x/127.5 - 1
        Self {
            alpha: [1.0 / 127.5; 3],
            beta: [-1.0; 3],
        }
    }

    /// Creates a normalizer mapping bytes to `[0, 1]` with no mean shift.
    pub fn unit() -> Self {
        Self {
            alpha: [1.0 / 255.0; 3],
            beta: [0.0; 3],
        }
    }

    /// Normalizes a single image into a `[1, 3, H, W]` tensor.
    pub fn normalize(&self, image: &RgbImage) -> VisionResult<Tensor4D> {
        self.normalize_batch(std::slice::from_ref(image))
    }

    /// Normalizes a batch of equally-sized images into a `[N, 3, H, W]`
    /// tensor. Images are processed in parallel for larger batches.
    pub fn normalize_batch(&self, images: &[RgbImage]) -> VisionResult<Tensor4D> {
        let first = images
            .first()
            .ok_or_else(|| VisionError::invalid_input("normalize_batch: empty image batch"))?;
        let (width, height) = first.dimensions();
        for (i, img) in images.iter().enumerate() {
            if img.dimensions() != (width, height) {
                return Err(VisionError::validation_error(
                    "Normalizer",
                    &format!("images[{i}] dimensions"),
                    &format!("{width}x{height}"),
                    &format!("{}x{}", img.width(), img.height()),
                ));
            }
        }

        let (w, h) = (width as usize, height as usize);
        let plane = w * h;
        let per_image = 3 * plane;

        let fill = |img: &RgbImage, chunk: &mut [f32]| {
            for (y, row) in img.rows().enumerate() {
                for (x, px) in row.enumerate() {
                    let base = y * w + x;
                    for c in 0..3 {
                        chunk[c * plane + base] = px.0[c] as f32 * self.alpha[c] + self.beta[c];
                    }
                }
            }
        };

        let mut data = vec![0.0f32; images.len() * per_image];
        if images.len() > 4 {
            data.par_chunks_exact_mut(per_image)
                .zip(images.par_iter())
                .for_each(|(chunk, img)| fill(img, chunk));
        } else {
            for (chunk, img) in data.chunks_exact_mut(per_image).zip(images.iter()) {
                fill(img, chunk);
            }
        }

        Ok(Tensor4D::from_shape_vec(
            (images.len(), 3, h, w),
            data,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rejects_zero_std() {
        assert!(Normalizer::new(None, None, Some([0.0, 1.0, 1.0])).is_err());
    }

    #[test]
    fn test_rejects_empty_batch() {
        let n = Normalizer::unit();
        assert!(n.normalize_batch(&[]).is_err());
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        let n = Normalizer::unit();
        let a = RgbImage::new(4, 4);
        let b = RgbImage::new(2, 2);
        assert!(n.normalize_batch(&[a, b]).is_err());
    }

    #[test]
    fn test_unit_normalization_values() {
        let n = Normalizer::unit();
        let img = RgbImage::from_pixel(2, 1, Rgb([255, 0, 51]));
        let tensor = n.normalize(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 0, 0]] - 0.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric_maps_midpoint_near_zero() {
        let n = Normalizer::symmetric();
        let img = RgbImage::from_pixel(1, 1, Rgb([128, 0, 255]));
        let tensor = n.normalize(&img).unwrap();
        assert!(tensor[[0, 0, 0, 0]].abs() < 0.01);
        assert!((tensor[[0, 1, 0, 0]] + 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 0, 0]] - 1.0).abs() < 0.01);
    }
}

//! Utility functions for loading and converting images.

use crate::core::errors::VisionError;
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::path::Path;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns `VisionError::ImageLoad` if the image cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<RgbImage, VisionError> {
    let img = image::open(path).map_err(VisionError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Loads a batch of images from file paths, in parallel for larger batches.
///
/// Fails on the first unloadable image.
pub fn load_images(paths: &[&Path]) -> Result<Vec<RgbImage>, VisionError> {
    if paths.len() > 4 {
        paths.par_iter().map(|p| load_image(p)).collect()
    } else {
        paths.iter().map(|p| load_image(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_image_missing_path_is_error() {
        let err = load_image(Path::new("/nonexistent/image.png")).unwrap_err();
        assert!(matches!(err, VisionError::ImageLoad(_)));
    }

    #[test]
    fn test_dynamic_to_rgb_preserves_dimensions() {
        let img = DynamicImage::new_luma8(5, 7);
        let rgb = dynamic_to_rgb(img);
        assert_eq!(rgb.dimensions(), (5, 7));
    }
}

//! Text detection and recognition.
//!
//! Detection runs a segmentation model whose probability map is converted to
//! text regions; recognition optionally decodes each region to a string via
//! greedy CTC over a character dictionary.

use crate::core::constants::{DEFAULT_LIMIT_SIDE_LEN, DEFAULT_SEQUENCE_IMAGE_SHAPE};
use crate::core::errors::{VisionError, VisionResult};
use crate::core::traits::{Detector, DetectorKind};
use crate::core::validation::{validate_positive, validate_range};
use crate::domain::{ImageBuffer, TextBlock};
use crate::processors::bitmap::{BitmapPostProcess, BitmapPostProcessConfig};
use crate::processors::ctc::SequenceDecoder;
use crate::processors::geometry::BoundRect;
use crate::processors::normalization::Normalizer;
use crate::processors::resize::{letterbox, resize_exact};
use crate::registry::{LoadedModel, ModelRegistry};
use image::RgbImage;
use image::imageops;
use ndarray::s;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Options for text detection and recognition.
///
/// Unrecognized keys deserialize into `extra` and are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Pixel-level threshold for the detection probability map. Default: 0.3
    pub score_threshold: f32,
    /// Region-level threshold for keeping detections. Default: 0.6
    pub box_threshold: f32,
    /// Maximum number of text regions returned. Default: 1000
    pub max_candidates: usize,
    /// Whether to run recognition on detected regions. Requires the
    /// detector to have been built with a recognition model. Default: true
    pub recognize: bool,
    /// Passthrough slot for forward compatibility; contents are ignored.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            score_threshold: 0.3,
            box_threshold: 0.6,
            max_candidates: 1000,
            recognize: true,
            extra: HashMap::new(),
        }
    }
}

impl TextOptions {
    /// Validates option values.
    pub fn validate(&self) -> VisionResult<()> {
        validate_range(self.score_threshold, 0.0, 1.0, "score_threshold")?;
        validate_range(self.box_threshold, 0.0, 1.0, "box_threshold")?;
        validate_positive(self.max_candidates, "max_candidates")?;
        Ok(())
    }
}

/// Segmentation-based text detector with optional recognition.
#[derive(Debug)]
pub struct TextDetector {
    detection: Arc<LoadedModel>,
    recognition: Option<Arc<LoadedModel>>,
    normalizer: Normalizer,
    rec_normalizer: Normalizer,
    decoder: SequenceDecoder,
    input_size: u32,
    rec_shape: [usize; 3],
}

/// Builder for [`TextDetector`].
#[derive(Debug, Default)]
pub struct TextDetectorBuilder {
    detection_model: Option<String>,
    recognition_model: Option<String>,
    charset: Option<Vec<String>>,
    input_size: Option<u32>,
}

impl TextDetectorBuilder {
    /// Creates a builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the registered detection model name.
    pub fn detection_model(mut self, name: impl Into<String>) -> Self {
        self.detection_model = Some(name.into());
        self
    }

    /// Sets the registered recognition model name. Without one, detection
    /// results carry no text.
    pub fn recognition_model(mut self, name: impl Into<String>) -> Self {
        self.recognition_model = Some(name.into());
        self
    }

    /// Sets the recognition character dictionary. Default: printable ASCII.
    pub fn charset(mut self, charset: Vec<String>) -> Self {
        self.charset = Some(charset);
        self
    }

    /// Sets the square detection input size. Default: 736.
    pub fn input_size(mut self, size: u32) -> Self {
        self.input_size = Some(size);
        self
    }

    /// Resolves models and builds the detector.
    pub fn build(self, registry: &ModelRegistry) -> VisionResult<TextDetector> {
        let det_name = self.detection_model.ok_or_else(|| {
            VisionError::config_error("text detector requires a detection model name")
        })?;
        let detection = registry.get_or_load(&det_name)?;
        let recognition = self
            .recognition_model
            .map(|name| registry.get_or_load(&name))
            .transpose()?;
        let decoder = match self.charset {
            Some(charset) => SequenceDecoder::new(charset)?,
            None => SequenceDecoder::ascii(),
        };
        Ok(TextDetector {
            detection,
            recognition,
            normalizer: Normalizer::new(None, None, None)?,
            rec_normalizer: Normalizer::symmetric(),
            decoder,
            input_size: self.input_size.unwrap_or(DEFAULT_LIMIT_SIDE_LEN),
            rec_shape: DEFAULT_SEQUENCE_IMAGE_SHAPE,
        })
    }
}

impl TextDetector {
    /// Crops a detected region out of the source image, clamped to bounds.
    fn crop_region(rgb: &RgbImage, region: &BoundRect) -> Option<RgbImage> {
        let clamped = region.clamp(rgb.width() as f32, rgb.height() as f32);
        let x = clamped.x1.floor() as u32;
        let y = clamped.y1.floor() as u32;
        let w = clamped.width().ceil() as u32;
        let h = clamped.height().ceil() as u32;
        if w == 0 || h == 0 {
            return None;
        }
        Some(imageops::crop_imm(rgb, x, y, w.min(rgb.width() - x), h.min(rgb.height() - y)).to_image())
    }

    /// Runs recognition on one cropped region.
    fn recognize_region(
        &self,
        model: &LoadedModel,
        crop: &RgbImage,
    ) -> VisionResult<(String, f32)> {
        let [_, rec_h, rec_w] = self.rec_shape;
        let resized = resize_exact(crop, (rec_w as u32, rec_h as u32));
        let tensor = self.rec_normalizer.normalize(&resized)?;
        let logits = model.engine.infer_3d(&tensor)?;
        // [1, T, C] -> [T, C]
        let view = logits.slice(s![0, .., ..]);
        self.decoder.decode(view)
    }
}

impl Detector for TextDetector {
    type Options = TextOptions;
    type Output = Vec<TextBlock>;

    fn kind(&self) -> DetectorKind {
        DetectorKind::Text
    }

    fn detect(&self, image: &ImageBuffer, options: &TextOptions) -> VisionResult<Vec<TextBlock>> {
        options.validate()?;

        let rgb = image.to_rgb()?;
        let target = (self.input_size, self.input_size);
        let (canvas, resize) = letterbox(&rgb, target);
        let tensor = self.normalizer.normalize(&canvas)?;

        let pred = self.detection.engine.infer_4d(&tensor)?;
        // [1, 1, H, W] probability map
        let prob_map = pred.slice(s![0, 0, .., ..]);

        let postprocess = BitmapPostProcess::new(BitmapPostProcessConfig {
            score_threshold: options.score_threshold,
            box_threshold: options.box_threshold,
            max_candidates: options.max_candidates,
            ..Default::default()
        })?;
        let regions = postprocess.apply(prob_map, &resize)?;
        debug!(
            regions = regions.len(),
            model = %self.detection.name,
            "text regions detected"
        );

        let recognition = options
            .recognize
            .then_some(self.recognition.as_ref())
            .flatten();

        let mut blocks = Vec::with_capacity(regions.len());
        for (region, _score) in regions {
            let block = match recognition {
                Some(model) => match Self::crop_region(&rgb, &region) {
                    Some(crop) => {
                        let (text, confidence) = self.recognize_region(model, &crop)?;
                        if text.is_empty() {
                            TextBlock::new(region)
                        } else {
                            TextBlock::with_text(region, text, confidence)
                        }
                    }
                    None => TextBlock::new(region),
                },
                None => TextBlock::new(region),
            };
            blocks.push(block);
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = TextOptions::default();
        assert_eq!(options.score_threshold, 0.3);
        assert_eq!(options.box_threshold, 0.6);
        assert!(options.recognize);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let options: TextOptions =
            serde_json::from_str(r#"{"recognize": false, "language_hints": ["en"]}"#).unwrap();
        assert!(!options.recognize);
        assert!(options.extra.contains_key("language_hints"));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let options = TextOptions {
            box_threshold: -0.1,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_crop_region_clamps_to_image() {
        let rgb = RgbImage::new(20, 10);
        let crop =
            TextDetector::crop_region(&rgb, &BoundRect::new(15.0, 5.0, 30.0, 30.0)).unwrap();
        assert_eq!(crop.dimensions(), (5, 5));
    }

    #[test]
    fn test_crop_region_degenerate_is_none() {
        let rgb = RgbImage::new(20, 10);
        assert!(TextDetector::crop_region(&rgb, &BoundRect::new(25.0, 5.0, 30.0, 8.0)).is_none());
    }

    #[test]
    fn test_builder_requires_detection_model() {
        let registry = ModelRegistry::default();
        assert!(TextDetectorBuilder::new().build(&registry).is_err());
    }
}

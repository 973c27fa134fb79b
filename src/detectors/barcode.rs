//! Barcode detection and payload decoding.
//!
//! Runs a detection model with three heads per candidate region: a box/score
//! head, a symbology classification head, and a character-sequence head
//! decoded into the payload string. Regions with an empty payload or a
//! filtered-out symbology are dropped.

use crate::core::constants::DEFAULT_BARCODE_INPUT_SIZE;
use crate::core::errors::{VisionError, VisionResult};
use crate::core::inference::RawOutput;
use crate::core::traits::{Detector, DetectorKind};
use crate::core::validation::validate_range;
use crate::domain::{BarcodeFormat, BarcodeRecord, ImageBuffer};
use crate::processors::ctc::SequenceDecoder;
use crate::processors::geometry::{BoundRect, non_max_suppression};
use crate::processors::normalization::Normalizer;
use crate::processors::resize::letterbox;
use crate::registry::{LoadedModel, ModelRegistry};
use crate::utils::tensor::argmax;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Options for barcode detection.
///
/// Unrecognized keys deserialize into `extra` and are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeOptions {
    /// Symbologies to report. Default: None (all symbologies).
    pub formats: Option<Vec<BarcodeFormat>>,
    /// Minimum detection confidence in [0, 1]. Default: 0.3
    pub min_confidence: f32,
    /// IoU threshold for non-maximum suppression. Default: 0.4
    pub nms_iou: f32,
    /// Passthrough slot for forward compatibility; contents are ignored.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            formats: None,
            min_confidence: 0.3,
            nms_iou: 0.4,
            extra: HashMap::new(),
        }
    }
}

impl BarcodeOptions {
    /// Validates option values.
    pub fn validate(&self) -> VisionResult<()> {
        validate_range(self.min_confidence, 0.0, 1.0, "min_confidence")?;
        validate_range(self.nms_iou, 0.0, 1.0, "nms_iou")?;
        Ok(())
    }

    fn accepts(&self, format: BarcodeFormat) -> bool {
        match &self.formats {
            Some(formats) => formats.contains(&format),
            None => true,
        }
    }
}

/// Multi-head barcode detector.
#[derive(Debug)]
pub struct BarcodeDetector {
    model: Arc<LoadedModel>,
    normalizer: Normalizer,
    decoder: SequenceDecoder,
    input_size: u32,
}

/// Builder for [`BarcodeDetector`].
#[derive(Debug, Default)]
pub struct BarcodeDetectorBuilder {
    model_name: Option<String>,
    input_size: Option<u32>,
}

impl BarcodeDetectorBuilder {
    /// Creates a builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the registered model name to resolve.
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    /// Sets the square model input size. Default: 640.
    pub fn input_size(mut self, size: u32) -> Self {
        self.input_size = Some(size);
        self
    }

    /// Resolves the model and builds the detector.
    pub fn build(self, registry: &ModelRegistry) -> VisionResult<BarcodeDetector> {
        let name = self
            .model_name
            .ok_or_else(|| VisionError::config_error("barcode detector requires a model name"))?;
        let model = registry.get_or_load(&name)?;
        Ok(BarcodeDetector {
            model,
            normalizer: Normalizer::unit(),
            decoder: SequenceDecoder::barcode(),
            input_size: self.input_size.unwrap_or(DEFAULT_BARCODE_INPUT_SIZE),
        })
    }
}

/// Candidate heads split out of the model outputs.
struct BarcodeHeads<'a> {
    /// `[N, 4]` boxes, normalized to the input canvas.
    boxes: &'a RawOutput,
    /// `[N]` confidence scores.
    scores: &'a RawOutput,
    /// `[N, S]` symbology logits.
    symbology: &'a RawOutput,
    /// `[N, T, C]` payload sequence logits.
    sequence: &'a RawOutput,
}

impl<'a> BarcodeHeads<'a> {
    fn split(outputs: &'a [RawOutput]) -> VisionResult<Self> {
        let [boxes, scores, symbology, sequence] = outputs else {
            return Err(VisionError::invalid_input(format!(
                "barcode model must emit 4 heads (boxes, scores, symbology, sequence), got {}",
                outputs.len()
            )));
        };
        Ok(Self {
            boxes,
            scores,
            symbology,
            sequence,
        })
    }

    fn candidate_count(&self) -> usize {
        // Leading batch dimension of 1 is tolerated on every head.
        self.scores.data.len()
    }
}

impl BarcodeDetector {
    fn decode_payload(
        &self,
        heads: &BarcodeHeads<'_>,
        candidate: usize,
    ) -> VisionResult<(String, f32)> {
        let shape = &heads.sequence.shape;
        let (timesteps, classes) = match shape.len() {
            4 => (shape[2], shape[3]),
            3 => (shape[1], shape[2]),
            _ => {
                return Err(VisionError::invalid_input(format!(
                    "barcode sequence head has unexpected shape {shape:?}"
                )));
            }
        };
        let stride = timesteps * classes;
        let start = candidate * stride;
        let slice = heads.sequence.data.get(start..start + stride).ok_or_else(|| {
            VisionError::invalid_input("barcode sequence head shorter than candidate count")
        })?;
        let view = ArrayView2::from_shape((timesteps, classes), slice)
            .map_err(VisionError::Tensor)?;
        self.decoder.decode(view)
    }
}

impl Detector for BarcodeDetector {
    type Options = BarcodeOptions;
    type Output = Vec<BarcodeRecord>;

    fn kind(&self) -> DetectorKind {
        DetectorKind::Barcode
    }

    fn detect(
        &self,
        image: &ImageBuffer,
        options: &BarcodeOptions,
    ) -> VisionResult<Vec<BarcodeRecord>> {
        options.validate()?;

        let rgb = image.to_rgb()?;
        let target = (self.input_size, self.input_size);
        let (canvas, resize) = letterbox(&rgb, target);
        let tensor = self.normalizer.normalize(&canvas)?;

        let outputs = self.model.engine.infer_all(&tensor)?;
        let heads = BarcodeHeads::split(&outputs)?;

        let count = heads.candidate_count();
        let symbology_classes = heads.symbology.data.len() / count.max(1);

        let mut boxes: Vec<BoundRect> = Vec::new();
        let mut scores: Vec<f32> = Vec::new();
        let mut indexes: Vec<usize> = Vec::new();
        for i in 0..count {
            let score = heads.scores.data[i];
            if score < options.min_confidence {
                continue;
            }
            let b = i * 4;
            let Some(coords) = heads.boxes.data.get(b..b + 4) else {
                break;
            };
            let rect = BoundRect::new(
                coords[0] * self.input_size as f32,
                coords[1] * self.input_size as f32,
                coords[2] * self.input_size as f32,
                coords[3] * self.input_size as f32,
            );
            boxes.push(resize.map_rect_back(&rect));
            scores.push(score);
            indexes.push(i);
        }

        let kept = non_max_suppression(&boxes, &scores, options.nms_iou);
        debug!(
            candidates = boxes.len(),
            kept = kept.len(),
            model = %self.model.name,
            "barcode candidates after NMS"
        );

        let mut records = Vec::with_capacity(kept.len());
        for &k in &kept {
            let candidate = indexes[k];
            let class_slice = &heads.symbology.data
                [candidate * symbology_classes..(candidate + 1) * symbology_classes];
            let format = argmax(class_slice)
                .map(|(class_id, _)| BarcodeFormat::from_class_id(class_id))
                .unwrap_or(BarcodeFormat::Unknown);
            if !options.accepts(format) {
                continue;
            }

            let (value, _) = self.decode_payload(&heads, candidate)?;
            if value.is_empty() {
                continue;
            }
            records.push(BarcodeRecord {
                region: boxes[k],
                format,
                value,
                confidence: scores[k],
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_accept_all_formats() {
        let options = BarcodeOptions::default();
        assert!(options.accepts(BarcodeFormat::QrCode));
        assert!(options.accepts(BarcodeFormat::Ean13));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_format_filter() {
        let options = BarcodeOptions {
            formats: Some(vec![BarcodeFormat::QrCode]),
            ..Default::default()
        };
        assert!(options.accepts(BarcodeFormat::QrCode));
        assert!(!options.accepts(BarcodeFormat::Code128));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let options: BarcodeOptions =
            serde_json::from_str(r#"{"min_confidence": 0.2, "auto_zoom": 1}"#).unwrap();
        assert_eq!(options.min_confidence, 0.2);
        assert!(options.extra.contains_key("auto_zoom"));
    }

    #[test]
    fn test_heads_split_requires_four_outputs() {
        let outputs = vec![
            RawOutput {
                shape: vec![1, 2, 4],
                data: vec![0.0; 8],
            };
            3
        ];
        assert!(BarcodeHeads::split(&outputs).is_err());
    }

    #[test]
    fn test_builder_requires_model_name() {
        let registry = ModelRegistry::default();
        assert!(BarcodeDetectorBuilder::new().build(&registry).is_err());
    }
}

//! Face detection.
//!
//! Runs an SCRFD-family anchor-based face detection model: letterboxed
//! input, per-stride score/bbox/landmark heads decoded in distance format,
//! confidence filtering, and IoU NMS.

use crate::core::constants::{DEFAULT_FACE_INPUT_SIZE, DEFAULT_MIN_CONFIDENCE, DEFAULT_NMS_IOU};
use crate::core::errors::{VisionError, VisionResult};
use crate::core::inference::RawOutput;
use crate::core::traits::{Detector, DetectorKind};
use crate::core::validation::validate_range;
use crate::domain::{FaceRecord, ImageBuffer};
use crate::processors::geometry::{BoundRect, non_max_suppression};
use crate::processors::normalization::Normalizer;
use crate::processors::resize::{ResizeInfo, letterbox};
use crate::registry::{LoadedModel, ModelRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Options for face detection.
///
/// Unrecognized keys deserialize into `extra` and are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceOptions {
    /// Minimum detection confidence in [0, 1]. Default: 0.5
    pub min_confidence: f32,
    /// IoU threshold for non-maximum suppression. Default: 0.4
    pub nms_iou: f32,
    /// Whether to include facial landmarks in results. Default: true
    pub with_landmarks: bool,
    /// Minimum face side length in source pixels; smaller faces are
    /// dropped. Default: None (keep all)
    pub min_face_size: Option<u32>,
    /// Passthrough slot for forward compatibility; contents are ignored.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for FaceOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            nms_iou: DEFAULT_NMS_IOU,
            with_landmarks: true,
            min_face_size: None,
            extra: HashMap::new(),
        }
    }
}

impl FaceOptions {
    /// Validates option values.
    pub fn validate(&self) -> VisionResult<()> {
        validate_range(self.min_confidence, 0.0, 1.0, "min_confidence")?;
        validate_range(self.nms_iou, 0.0, 1.0, "nms_iou")?;
        Ok(())
    }
}

/// Head layout of an SCRFD-family model, derived from its output count.
#[derive(Debug, Clone, Copy)]
struct HeadLayout {
    strides: &'static [usize],
    with_landmarks: bool,
    anchors_per_cell: usize,
}

impl HeadLayout {
    fn from_output_count(count: usize) -> VisionResult<Self> {
        const SHORT: &[usize] = &[8, 16, 32];
        const LONG: &[usize] = &[8, 16, 32, 64, 128];
        match count {
            6 => Ok(Self {
                strides: SHORT,
                with_landmarks: false,
                anchors_per_cell: 2,
            }),
            9 => Ok(Self {
                strides: SHORT,
                with_landmarks: true,
                anchors_per_cell: 2,
            }),
            10 => Ok(Self {
                strides: LONG,
                with_landmarks: false,
                anchors_per_cell: 1,
            }),
            15 => Ok(Self {
                strides: LONG,
                with_landmarks: true,
                anchors_per_cell: 1,
            }),
            other => Err(VisionError::invalid_input(format!(
                "unsupported face model head layout: {other} outputs"
            ))),
        }
    }

    fn stride_count(&self) -> usize {
        self.strides.len()
    }
}

/// SCRFD-style face detector.
#[derive(Debug)]
pub struct FaceDetector {
    model: Arc<LoadedModel>,
    normalizer: Normalizer,
    input_size: u32,
}

/// Builder for [`FaceDetector`].
#[derive(Debug, Default)]
pub struct FaceDetectorBuilder {
    model_name: Option<String>,
    input_size: Option<u32>,
}

impl FaceDetectorBuilder {
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
    pub fn build(self, registry: &ModelRegistry) -> VisionResult<FaceDetector> {
        let name = self
            .model_name
            .ok_or_else(|| VisionError::config_error("face detector requires a model name"))?;
        let model = registry.get_or_load(&name)?;
        Ok(FaceDetector {
            model,
            normalizer: Normalizer::symmetric(),
            input_size: self.input_size.unwrap_or(DEFAULT_FACE_INPUT_SIZE),
        })
    }
}

impl FaceDetector {
    fn decode_stride(
        &self,
        layout: HeadLayout,
        stride_idx: usize,
        outputs: &[RawOutput],
        min_confidence: f32,
        resize: &ResizeInfo,
        candidates: &mut Vec<(BoundRect, f32, Option<[(f32, f32); 5]>)>,
    ) {
        let stride = layout.strides[stride_idx];
        let scores = &outputs[stride_idx].data;
        let bboxes = &outputs[stride_idx + layout.stride_count()].data;
        let landmarks = layout
            .with_landmarks
            .then(|| &outputs[stride_idx + 2 * layout.stride_count()].data);

        let cells = (self.input_size as usize / stride).max(1);
        let mut anchor = 0usize;
        for y in 0..cells {
            for x in 0..cells {
                let cx = (x * stride) as f32;
                let cy = (y * stride) as f32;
                for _ in 0..layout.anchors_per_cell {
                    let i = anchor;
                    anchor += 1;
                    let Some(&score) = scores.get(i) else { break };
                    if score < min_confidence {
                        continue;
                    }
                    let b = i * 4;
                    if b + 3 >= bboxes.len() {
                        continue;
                    }
                    // Distance format: offsets to left/top/right/bottom edges.
                    let rect = BoundRect::new(
                        cx - bboxes[b] * stride as f32,
                        cy - bboxes[b + 1] * stride as f32,
                        cx + bboxes[b + 2] * stride as f32,
                        cy + bboxes[b + 3] * stride as f32,
                    );
                    let mapped = resize.map_rect_back(&rect);

                    let kps = landmarks.and_then(|data| {
                        let k = i * 10;
                        if k + 9 >= data.len() {
                            return None;
                        }
                        let mut points = [(0.0f32, 0.0f32); 5];
                        for (j, point) in points.iter_mut().enumerate() {
                            let lx = cx + data[k + j * 2] * stride as f32;
                            let ly = cy + data[k + j * 2 + 1] * stride as f32;
                            *point = resize.map_back(lx, ly);
                        }
                        Some(points)
                    });
                    candidates.push((mapped, score, kps));
                }
            }
        }
    }
}

impl Detector for FaceDetector {
    type Options = FaceOptions;
    type Output = Vec<FaceRecord>;

    fn kind(&self) -> DetectorKind {
        DetectorKind::Face
    }

    fn detect(
        &self,
        image: &ImageBuffer,
        options: &FaceOptions,
    ) -> VisionResult<Vec<FaceRecord>> {
        options.validate()?;

        let rgb = image.to_rgb()?;
        let target = (self.input_size, self.input_size);
        let (canvas, resize) = letterbox(&rgb, target);
        let tensor = self.normalizer.normalize(&canvas)?;

        let outputs = self.model.engine.infer_all(&tensor)?;
        let layout = HeadLayout::from_output_count(outputs.len())?;

        let mut candidates: Vec<(BoundRect, f32, Option<[(f32, f32); 5]>)> = Vec::new();
        for stride_idx in 0..layout.stride_count() {
            self.decode_stride(
                layout,
                stride_idx,
                &outputs,
                options.min_confidence,
                &resize,
                &mut candidates,
            );
        }
        debug!(
            candidates = candidates.len(),
            model = %self.model.name,
            "face candidates before NMS"
        );

        let boxes: Vec<BoundRect> = candidates.iter().map(|c| c.0).collect();
        let scores: Vec<f32> = candidates.iter().map(|c| c.1).collect();
        let kept = non_max_suppression(&boxes, &scores, options.nms_iou);

        let min_side = options.min_face_size.map(|s| s as f32).unwrap_or(0.0);
        let records = kept
            .into_iter()
            .filter(|&idx| candidates[idx].0.min_side() >= min_side)
            .map(|idx| {
                let (region, confidence, landmarks) = candidates[idx].clone();
                FaceRecord {
                    region,
                    confidence,
                    landmarks: options.with_landmarks.then_some(landmarks).flatten(),
                }
            })
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = FaceOptions::default();
        assert_eq!(options.min_confidence, DEFAULT_MIN_CONFIDENCE);
        assert_eq!(options.nms_iou, DEFAULT_NMS_IOU);
        assert!(options.with_landmarks);
        assert!(options.min_face_size.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_unknown_keys_land_in_extra() {
        let options: FaceOptions = serde_json::from_str(
            r#"{"min_confidence": 0.7, "turbo_mode": true}"#,
        )
        .unwrap();
        assert_eq!(options.min_confidence, 0.7);
        assert!(options.extra.contains_key("turbo_mode"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_empty_options_object_is_all_defaults() {
        let options: FaceOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.min_confidence, FaceOptions::default().min_confidence);
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let options = FaceOptions {
            min_confidence: 1.5,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_head_layout_from_output_count() {
        let layout = HeadLayout::from_output_count(9).unwrap();
        assert_eq!(layout.strides, &[8, 16, 32]);
        assert!(layout.with_landmarks);
        assert_eq!(layout.anchors_per_cell, 2);

        let layout = HeadLayout::from_output_count(10).unwrap();
        assert_eq!(layout.strides.len(), 5);
        assert!(!layout.with_landmarks);

        assert!(HeadLayout::from_output_count(7).is_err());
    }

    #[test]
    fn test_builder_requires_model_name() {
        let registry = ModelRegistry::default();
        assert!(FaceDetectorBuilder::new().build(&registry).is_err());
    }
}

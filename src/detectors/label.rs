//! Whole-image label classification.
//!
//! Runs a classification model and extracts the top-k labels above a
//! confidence floor. A label table maps class indexes to names; models
//! resolved from cloud-registered sources run through the exact same path.

use crate::core::constants::{
    DEFAULT_CLASSIFICATION_INPUT_SHAPE, DEFAULT_MIN_CONFIDENCE, DEFAULT_TOPK,
};
use crate::core::errors::{VisionError, VisionResult};
use crate::core::traits::{Detector, DetectorKind};
use crate::core::validation::{validate_positive, validate_range};
use crate::domain::{ImageBuffer, LabelRecord};
use crate::processors::normalization::Normalizer;
use crate::processors::resize::resize_exact;
use crate::processors::topk::Topk;
use crate::registry::{LoadedModel, ModelRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Options for label classification.
///
/// Unrecognized keys deserialize into `extra` and are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelOptions {
    /// Minimum label confidence in [0, 1]. Default: 0.5
    pub min_confidence: f32,
    /// Maximum number of labels returned. Default: 5
    pub top_k: usize,
    /// Passthrough slot for forward compatibility; contents are ignored.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            top_k: DEFAULT_TOPK,
            extra: HashMap::new(),
        }
    }
}

impl LabelOptions {
    /// Validates option values.
    pub fn validate(&self) -> VisionResult<()> {
        validate_range(self.min_confidence, 0.0, 1.0, "min_confidence")?;
        validate_positive(self.top_k, "top_k")?;
        Ok(())
    }
}

/// Classification-based label detector.
#[derive(Debug)]
pub struct LabelDetector {
    model: Arc<LoadedModel>,
    normalizer: Normalizer,
    topk: Topk,
    input_shape: (u32, u32),
}

/// Builder for [`LabelDetector`].
#[derive(Debug, Default)]
pub struct LabelDetectorBuilder {
    model_name: Option<String>,
    class_names: Option<Vec<String>>,
    input_shape: Option<(u32, u32)>,
}

impl LabelDetectorBuilder {
    /// Creates a builder with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the registered model name to resolve.
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    /// Sets the class-name table (index = class ID).
    pub fn class_names(mut self, names: Vec<String>) -> Self {
        self.class_names = Some(names);
        self
    }

    /// Sets the model input shape (width, height). Default: 224x224.
    pub fn input_shape(mut self, shape: (u32, u32)) -> Self {
        self.input_shape = Some(shape);
        self
    }

    /// Resolves the model and builds the detector.
    pub fn build(self, registry: &ModelRegistry) -> VisionResult<LabelDetector> {
        let name = self
            .model_name
            .ok_or_else(|| VisionError::config_error("label detector requires a model name"))?;
        let model = registry.get_or_load(&name)?;
        let topk = match self.class_names {
            Some(names) => Topk::with_class_names(names),
            None => Topk::without_class_names(),
        };
        Ok(LabelDetector {
            model,
            normalizer: Normalizer::new(None, None, None)?,
            topk,
            input_shape: self.input_shape.unwrap_or(DEFAULT_CLASSIFICATION_INPUT_SHAPE),
        })
    }
}

impl Detector for LabelDetector {
    type Options = LabelOptions;
    type Output = Vec<LabelRecord>;

    fn kind(&self) -> DetectorKind {
        DetectorKind::Label
    }

    fn detect(
        &self,
        image: &ImageBuffer,
        options: &LabelOptions,
    ) -> VisionResult<Vec<LabelRecord>> {
        options.validate()?;

        let rgb = image.to_rgb()?;
        let resized = resize_exact(&rgb, self.input_shape);
        let tensor = self.normalizer.normalize(&resized)?;

        let logits = self.model.engine.infer_2d(&tensor)?;
        let result = self.topk.apply(logits.view(), options.top_k)?;

        let indexes = result.indexes.into_iter().next().unwrap_or_default();
        let scores = result.scores.into_iter().next().unwrap_or_default();
        let names = result
            .class_names
            .and_then(|n| n.into_iter().next());

        let records: Vec<LabelRecord> = indexes
            .into_iter()
            .zip(scores)
            .enumerate()
            .filter(|(_, (_, score))| *score >= options.min_confidence)
            .map(|(rank, (class_id, confidence))| LabelRecord {
                class_id,
                name: names.as_ref().and_then(|n| n.get(rank).cloned()),
                confidence,
            })
            .collect();
        debug!(
            labels = records.len(),
            model = %self.model.name,
            "labels above confidence floor"
        );
        Ok(records)
    }
}

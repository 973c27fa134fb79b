//! Generic tensor-in/tensor-out custom model runs.
//!
//! Unlike the typed detectors, custom runs name their model per call and
//! exchange raw tensors. Input is validated before any model work: empty or
//! shape-inconsistent buffers never reach the engine. The caller's buffer is
//! read-only for the duration of the call and not retained afterward.

use crate::core::constants::MAX_TENSOR_SIZE;
use crate::core::errors::{VisionError, VisionResult};
use crate::core::traits::DetectorKind;
use crate::core::validation::validate_positive;
use crate::domain::TensorData;
use crate::registry::ModelRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Options for custom model runs.
///
/// Unrecognized keys deserialize into `extra` and are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomOptions {
    /// Upper bound on output element count, guarding against models that
    /// declare runaway dynamic shapes. Default: 100_000_000
    pub max_output_elements: usize,
    /// Passthrough slot for forward compatibility; contents are ignored.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for CustomOptions {
    fn default() -> Self {
        Self {
            max_output_elements: MAX_TENSOR_SIZE,
            extra: HashMap::new(),
        }
    }
}

impl CustomOptions {
    /// Validates option values.
    pub fn validate(&self) -> VisionResult<()> {
        validate_positive(self.max_output_elements, "max_output_elements")?;
        Ok(())
    }
}

/// Runs registered models on caller-provided tensors.
#[derive(Debug)]
pub struct CustomModelDetector {
    registry: Arc<ModelRegistry>,
}

impl CustomModelDetector {
    /// Creates a runner over the given registry.
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the variant identifier.
    pub fn kind(&self) -> DetectorKind {
        DetectorKind::CustomModel
    }

    /// Runs the named model on the input tensor.
    ///
    /// The input is validated before the model is resolved or invoked; a
    /// zero-length byte buffer or a byte length inconsistent with the
    /// declared shape fails with an input-validation error.
    pub fn run(
        &self,
        model_name: &str,
        options: &CustomOptions,
        input: &TensorData,
    ) -> VisionResult<TensorData> {
        options.validate()?;
        input.validate()?;

        let values = input.to_f32_vec()?;
        let model = self.registry.get_or_load(model_name)?;
        let output = model.engine.infer_dyn(&input.shape, &values)?;

        let element_count: usize = output.shape.iter().product();
        if element_count > options.max_output_elements {
            return Err(VisionError::resource_limit_error(
                "output elements",
                options.max_output_elements,
                element_count,
            ));
        }
        debug!(
            model = model_name,
            input_shape = ?input.shape,
            output_shape = ?output.shape,
            "custom model run complete"
        );
        Ok(TensorData::from_f32(output.shape, &output.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TensorDtype;

    fn runner() -> CustomModelDetector {
        CustomModelDetector::new(Arc::new(ModelRegistry::default()))
    }

    #[test]
    fn test_empty_input_bytes_fail_before_model_resolution() {
        let input = TensorData {
            dtype: TensorDtype::F32,
            shape: vec![1, 4],
            bytes: vec![],
        };
        // "unregistered-model" does not exist; an input-validation error (not
        // a model-unavailable error) proves the input check ran first.
        let err = runner()
            .run("unregistered-model", &CustomOptions::default(), &input)
            .unwrap_err();
        assert!(matches!(err, VisionError::InvalidInput { .. }));
    }

    #[test]
    fn test_shape_mismatch_fails_before_model_resolution() {
        let input = TensorData {
            dtype: TensorDtype::F32,
            shape: vec![2, 2],
            bytes: vec![0u8; 12],
        };
        let err = runner()
            .run("unregistered-model", &CustomOptions::default(), &input)
            .unwrap_err();
        assert!(matches!(err, VisionError::InvalidInput { .. }));
    }

    #[test]
    fn test_valid_input_reaches_registry() {
        let input = TensorData::from_f32(vec![1, 2], &[1.0, 2.0]);
        let err = runner()
            .run("unregistered-model", &CustomOptions::default(), &input)
            .unwrap_err();
        assert!(matches!(err, VisionError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_zero_max_output_elements_rejected() {
        let options = CustomOptions {
            max_output_elements: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}

//! Helper constructors for [`VisionError`].
//!
//! These keep call sites short while producing errors that carry enough
//! context to diagnose failures without a debugger attached.

use super::{ProcessingStage, SimpleError, VisionError};
use std::path::Path;

impl VisionError {
    /// Creates an error for a failed preprocessing step.
    pub fn preprocessing(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage: ProcessingStage::Preprocessing,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a failed normalization step.
    pub fn normalization(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage: ProcessingStage::Normalization,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a failed resize step.
    pub fn resize_error(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage: ProcessingStage::Resize,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a failed post-processing step.
    pub fn post_processing(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage: ProcessingStage::PostProcessing,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a failed sequence decode step.
    pub fn decode_error(context: impl Into<String>) -> Self {
        Self::Processing {
            stage: ProcessingStage::Decode,
            context: context.into(),
            source: Box::new(SimpleError::new("decode failed")),
        }
    }

    /// Creates a generic processing error from a plain message.
    pub fn processing_error(context: impl Into<String>) -> Self {
        Self::Processing {
            stage: ProcessingStage::Generic,
            context: context.into(),
            source: Box::new(SimpleError::new("processing failed")),
        }
    }

    /// Creates an error describing invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a configuration error naming the offending field and value.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!("invalid value '{value}' for '{field}': {reason}"),
        }
    }

    /// Creates a validation error with component, field, expected and actual values.
    pub fn validation_error(component: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidInput {
            message: format!("{component}: {field} expected {expected}, got {actual}"),
        }
    }

    /// Creates an inference error for the named model.
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a model load error for the given path.
    ///
    /// The optional `hint` is appended to the context to point the caller at
    /// a likely fix (missing file, wrong format, ...).
    pub fn model_load_error(
        path: &Path,
        context: &str,
        hint: Option<&str>,
        error: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let context = match hint {
            Some(hint) => format!("{context} ({hint})"),
            None => context.to_string(),
        };
        Self::ModelLoad {
            path: path.display().to_string(),
            context,
            source: error.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Creates an error for an unresolvable model name.
    pub fn model_unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a resource limit error.
    pub fn resource_limit_error(resource: &str, limit: usize, requested: usize) -> Self {
        Self::ResourceLimit {
            resource: resource.to_string(),
            limit,
            requested,
        }
    }

    /// Creates a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_produce_expected_variants() {
        assert!(matches!(
            VisionError::invalid_input("x"),
            VisionError::InvalidInput { .. }
        ));
        assert!(matches!(
            VisionError::config_error("x"),
            VisionError::ConfigError { .. }
        ));
        assert!(matches!(
            VisionError::resource_limit_error("in_flight", 4, 9),
            VisionError::ResourceLimit {
                limit: 4,
                requested: 9,
                ..
            }
        ));
        assert!(matches!(
            VisionError::timeout("detect", 100),
            VisionError::Timeout {
                timeout_ms: 100,
                ..
            }
        ));
    }

    #[test]
    fn test_model_load_error_appends_hint() {
        let err = VisionError::model_load_error(
            Path::new("/m/model.onnx"),
            "failed to create session",
            Some("verify model file exists"),
            None::<std::io::Error>,
        );
        let text = err.to_string();
        assert!(text.contains("/m/model.onnx"));
        assert!(text.contains("verify model file exists"));
    }

    #[test]
    fn test_validation_error_mentions_field() {
        let err = VisionError::validation_error("FaceDetector", "min_confidence", "[0, 1]", "1.5");
        assert!(err.to_string().contains("min_confidence"));
    }
}
